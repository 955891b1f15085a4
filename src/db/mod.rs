use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::cache_key::CacheKeys;
use crate::constants::cache::TTL_HOURS;

pub mod migrator;
pub mod repositories;

pub use repositories::cache::CacheRepository;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    cache_ttl: chrono::Duration,
    owned_prefixes: Vec<String>,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Every connection to `:memory:` is its own database, so the pool must
        // hold exactly one and never recycle it.
        let (max_connections, min_connections) = if in_memory {
            opt.max_connections(1).min_connections(1);
            (1, 1)
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
            (max_connections, min_connections)
        };

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            cache_ttl: chrono::Duration::hours(TTL_HOURS),
            owned_prefixes: CacheKeys::default().owned_prefixes(),
        })
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Scopes `cache_clear(None)` to the namespace `keys` writes under.
    #[must_use]
    pub fn with_cache_keys(mut self, keys: &CacheKeys) -> Self {
        self.owned_prefixes = keys.owned_prefixes();
        self
    }

    fn cache_repo(&self) -> CacheRepository {
        CacheRepository::new(
            self.conn.clone(),
            self.cache_ttl,
            self.owned_prefixes.clone(),
        )
    }

    pub async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.cache_repo().get(key).await
    }

    pub async fn cache_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.cache_repo().set(key, value).await
    }

    pub async fn cache_clear(&self, key: Option<&str>) -> Result<u64> {
        self.cache_repo().clear(key).await
    }

    pub async fn cache_clear_all(&self) -> Result<u64> {
        self.cache_repo().clear_all().await
    }

    pub async fn cache_len(&self) -> Result<u64> {
        self.cache_repo().len().await
    }
}
