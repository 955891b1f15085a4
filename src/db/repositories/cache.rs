use crate::entities::{cache_entries, prelude::*};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// JSON key/value cache with a single store-wide TTL.
pub struct CacheRepository {
    conn: DatabaseConnection,
    ttl: chrono::Duration,
    owned_prefixes: Vec<String>,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(
        conn: DatabaseConnection,
        ttl: chrono::Duration,
        owned_prefixes: Vec<String>,
    ) -> Self {
        Self {
            conn,
            ttl,
            owned_prefixes,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_at(key, Utc::now()).await
    }

    /// Reads `key` as of `now`. Expired or unreadable entries are evicted and
    /// reported as a miss.
    pub async fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>> {
        let Some(entry) = CacheEntries::find_by_id(key.to_string())
            .one(&self.conn)
            .await?
        else {
            metrics::counter!("cache_misses_total").increment(1);
            return Ok(None);
        };

        let written_at = match DateTime::parse_from_rfc3339(&entry.written_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(key, error = %e, "Cache entry has unreadable timestamp, evicting");
                self.evict(&entry).await?;
                metrics::counter!("cache_misses_total").increment(1);
                return Ok(None);
            }
        };

        if now - written_at > self.ttl {
            debug!(key, written_at = %entry.written_at, "Cache entry expired");
            self.evict(&entry).await?;
            metrics::counter!("cache_misses_total").increment(1);
            return Ok(None);
        }

        match serde_json::from_str(&entry.payload) {
            Ok(value) => {
                metrics::counter!("cache_hits_total").increment(1);
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key, error = %e, "Cache entry has unreadable payload, evicting");
                self.evict(&entry).await?;
                metrics::counter!("cache_misses_total").increment(1);
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set_at(key, value, Utc::now()).await
    }

    pub async fn set_at<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;

        let active_model = cache_entries::ActiveModel {
            key: Set(key.to_string()),
            payload: Set(payload),
            written_at: Set(now.to_rfc3339()),
        };

        CacheEntries::insert(active_model)
            .on_conflict(
                OnConflict::column(cache_entries::Column::Key)
                    .update_columns([
                        cache_entries::Column::Payload,
                        cache_entries::Column::WrittenAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Removes one key, or with `None` every key under an owned prefix.
    pub async fn clear(&self, key: Option<&str>) -> Result<u64> {
        let result = match key {
            Some(key) => {
                CacheEntries::delete_by_id(key.to_string())
                    .exec(&self.conn)
                    .await?
            }
            None => {
                let owned = self
                    .owned_prefixes
                    .iter()
                    .fold(Condition::any(), |cond, prefix| {
                        cond.add(cache_entries::Column::Key.starts_with(prefix.as_str()))
                    });

                CacheEntries::delete_many()
                    .filter(owned)
                    .exec(&self.conn)
                    .await?
            }
        };

        Ok(result.rows_affected)
    }

    pub async fn clear_all(&self) -> Result<u64> {
        let result = CacheEntries::delete_many().exec(&self.conn).await?;
        Ok(result.rows_affected)
    }

    pub async fn len(&self) -> Result<u64> {
        Ok(CacheEntries::find().count(&self.conn).await?)
    }

    // Only removes the row if it still carries the timestamp we judged, so a
    // fresh write racing with this eviction survives.
    async fn evict(&self, entry: &cache_entries::Model) -> Result<()> {
        CacheEntries::delete_many()
            .filter(cache_entries::Column::Key.eq(entry.key.as_str()))
            .filter(cache_entries::Column::WrittenAt.eq(entry.written_at.as_str()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
