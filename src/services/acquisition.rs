//! Paginated acquisition of season, upcoming and per-title episode listings.
//!
//! Every listing is read through the cache and written back on a miss. Cache
//! failures never fail an acquisition: a failed read is treated as a miss and
//! a failed write is only logged.

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache_key::CacheKeys;
use crate::clients::jikan::{JikanApi, JikanError};
use crate::config::{PaginationMode, RankingConfig};
use crate::db::Store;
use crate::domain::{AnimeId, Season};
use crate::models::anime::{Page, RemoteEpisode, RemoteTitle};

/// A title whose episodes could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionFailure {
    pub anime_id: AnimeId,
    pub title: String,
    pub message: String,
}

/// Successes and per-item failures of a batch acquisition.
#[derive(Debug, Clone)]
pub struct Partial<T> {
    pub items: Vec<T>,
    pub failures: Vec<AcquisitionFailure>,
}

impl<T> Partial<T> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<T> Default for Partial<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TitleEpisodes {
    pub title: RemoteTitle,
    pub episodes: Vec<RemoteEpisode>,
}

#[derive(Debug, Clone, Copy)]
pub struct AcquisitionSettings {
    pub max_season_pages: u32,
    pub max_episode_pages: u32,
    pub max_in_flight: usize,
    pub pagination: PaginationMode,
}

impl From<&RankingConfig> for AcquisitionSettings {
    fn from(config: &RankingConfig) -> Self {
        Self {
            max_season_pages: config.max_season_pages.max(1),
            max_episode_pages: config.max_episode_pages.max(1),
            max_in_flight: config.max_in_flight.max(1),
            pagination: config.episode_pagination,
        }
    }
}

pub struct Acquisition {
    api: Arc<dyn JikanApi>,
    store: Store,
    keys: CacheKeys,
    settings: AcquisitionSettings,
}

impl Acquisition {
    #[must_use]
    pub const fn new(
        api: Arc<dyn JikanApi>,
        store: Store,
        keys: CacheKeys,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            api,
            store,
            keys,
            settings,
        }
    }

    /// Every title of a season, following pagination up to the page ceiling.
    pub async fn season_titles(
        &self,
        year: i32,
        season: Season,
    ) -> Result<Vec<RemoteTitle>, JikanError> {
        let max_pages = self.settings.max_season_pages;
        let key = self.keys.season(year, season, max_pages);

        self.cached(&key, || async {
            let titles = collect_pages(max_pages, |page| {
                self.api.season_page(year, season, page)
            })
            .await?;
            info!(year, %season, count = titles.len(), "Fetched season listing");
            Ok(unique_titles(titles))
        })
        .await
    }

    /// Titles announced for future seasons.
    pub async fn upcoming_titles(&self) -> Result<Vec<RemoteTitle>, JikanError> {
        let max_pages = self.settings.max_season_pages;
        let key = self.keys.upcoming(max_pages);

        self.cached(&key, || async {
            let titles = collect_pages(max_pages, |page| self.api.upcoming_page(page)).await?;
            info!(count = titles.len(), "Fetched upcoming listing");
            Ok(unique_titles(titles))
        })
        .await
    }

    pub async fn title(&self, id: AnimeId) -> Result<RemoteTitle, JikanError> {
        let key = self.keys.anime(id);
        self.cached(&key, || self.api.anime(id)).await
    }

    /// Episode listing of one title under the configured pagination mode.
    pub async fn title_episodes(&self, id: AnimeId) -> Result<Vec<RemoteEpisode>, JikanError> {
        let mode = self.settings.pagination;
        let key = self.keys.episodes(id, mode);

        self.cached(&key, || async {
            match mode {
                PaginationMode::AssumeAppendOnly => self.first_and_last_episode_pages(id).await,
                PaginationMode::Full => {
                    collect_pages(self.settings.max_episode_pages, |page| {
                        self.api.episodes_page(id, page)
                    })
                    .await
                }
            }
        })
        .await
    }

    /// Episodes of many titles, at most `max_in_flight` listings at a time.
    /// Results keep the order of `titles`.
    pub async fn episodes_for_titles(&self, titles: &[RemoteTitle]) -> Partial<TitleEpisodes> {
        let results: Vec<_> = stream::iter(titles)
            .map(|title| async move { (title, self.title_episodes(title.mal_id).await) })
            .buffered(self.settings.max_in_flight)
            .collect()
            .await;

        let mut partial = Partial::default();
        for (title, result) in results {
            match result {
                Ok(episodes) => partial.items.push(TitleEpisodes {
                    title: title.clone(),
                    episodes,
                }),
                Err(e) => {
                    warn!(
                        anime_id = %title.mal_id,
                        title = title.display_title(),
                        error = %e,
                        "Failed to fetch episodes, title contributes nothing"
                    );
                    partial.failures.push(AcquisitionFailure {
                        anime_id: title.mal_id,
                        title: title.display_title().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        partial
    }

    async fn first_and_last_episode_pages(
        &self,
        id: AnimeId,
    ) -> Result<Vec<RemoteEpisode>, JikanError> {
        let first = self.api.episodes_page(id, 1).await?;
        let last_page = first.pagination.last_visible_page;
        let has_more = first.has_more();
        let mut episodes = first.data;

        if has_more && last_page > 1 {
            debug!(anime_id = %id, last_page, "Skipping to last episode page");
            let last = self.api.episodes_page(id, last_page).await?;
            episodes.extend(last.data);
        }

        Ok(episodes)
    }

    async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, JikanError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, JikanError>>,
    {
        match self.store.cache_get::<T>(key).await {
            Ok(Some(value)) => {
                debug!(key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed, fetching from Jikan"),
        }

        let value = fetch().await?;

        if let Err(e) = self.store.cache_set(key, &value).await {
            warn!(key, error = %e, "Failed to write cache entry");
        }

        Ok(value)
    }
}

async fn collect_pages<T, F, Fut>(max_pages: u32, mut fetch_page: F) -> Result<Vec<T>, JikanError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, JikanError>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let current = fetch_page(page).await?;
        let has_more = current.has_more();
        items.extend(current.data);

        if !has_more || page >= max_pages {
            break;
        }
        page += 1;
    }

    Ok(items)
}

/// Listings occasionally repeat a title across page boundaries.
fn unique_titles(titles: Vec<RemoteTitle>) -> Vec<RemoteTitle> {
    let mut seen = HashSet::new();
    titles
        .into_iter()
        .filter(|t| seen.insert(t.mal_id))
        .collect()
}
