use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants;
use crate::domain::Season;
use crate::domain::window::SeasonCalendar;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub jikan: JikanConfig,

    pub cache: CacheConfig,

    pub season: SeasonConfig,

    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/animerank.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanConfig {
    pub base_url: String,

    pub user_agent: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Minimum gap between the start of two outbound requests, process-wide.
    pub min_request_interval_ms: u64,

    /// Attempts per logical call, throttled responses excluded.
    pub max_retries: u32,

    /// Backoff after the n-th failed attempt is `retry_base_delay_ms * n`.
    pub retry_base_delay_ms: u64,

    /// Used when a 429 response carries no usable Retry-After header.
    pub default_retry_after_secs: u64,

    /// Upper bound on 429 waits for one logical call before giving up.
    pub max_throttle_waits: u32,
}

impl Default for JikanConfig {
    fn default() -> Self {
        Self {
            base_url: constants::JIKAN_API.to_string(),
            user_agent: "animerank/0.1".to_string(),
            request_timeout_seconds: 30,
            min_request_interval_ms: millis(constants::intervals::MIN_REQUEST_INTERVAL),
            max_retries: constants::limits::MAX_ATTEMPTS,
            retry_base_delay_ms: millis(constants::intervals::RETRY_BASE_DELAY),
            default_retry_after_secs: constants::intervals::DEFAULT_RETRY_AFTER.as_secs(),
            max_throttle_waits: constants::limits::MAX_THROTTLE_WAITS,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl JikanConfig {
    #[must_use]
    pub const fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace prefix for every key. Bump it to invalidate all cached payloads.
    pub version: String,

    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: constants::cache::VERSION.to_string(),
            ttl_hours: constants::cache::TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    pub name: Season,

    pub year: i32,

    /// First day (UTC) of week 1.
    pub epoch: NaiveDate,

    pub total_weeks: u32,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            name: Season::Fall,
            year: 2025,
            epoch: NaiveDate::from_ymd_opt(2025, 9, 29).unwrap_or_default(),
            total_weeks: 13,
        }
    }
}

impl SeasonConfig {
    #[must_use]
    pub const fn calendar(&self) -> SeasonCalendar {
        SeasonCalendar::new(self.epoch, self.total_weeks)
    }
}

/// How a title's episode listing is paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Page 1 plus the last page only. Correct while a listing only ever grows
    /// at the end; episodes in middle pages are never seen.
    #[default]
    AssumeAppendOnly,

    /// Every page, up to `max_episode_pages`.
    Full,
}

impl PaginationMode {
    #[must_use]
    pub const fn cache_tag(self) -> &'static str {
        match self {
            Self::AssumeAppendOnly => "tail",
            Self::Full => "all",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Titles with fewer members are left out of the weekly ranking entirely.
    pub min_members: u64,

    pub max_results: usize,

    pub max_season_pages: u32,

    pub max_episode_pages: u32,

    /// Episode listings requested concurrently. The request queue still spaces
    /// their dispatch.
    pub max_in_flight: usize,

    pub episode_pagination: PaginationMode,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_members: constants::limits::MIN_MEMBERS,
            max_results: constants::limits::MAX_RANKED_EPISODES,
            max_season_pages: constants::limits::MAX_SEASON_PAGES,
            max_episode_pages: constants::limits::MAX_EPISODE_PAGES,
            max_in_flight: 4,
            episode_pagination: PaginationMode::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("animerank").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".animerank").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jikan.base_url.is_empty() {
            anyhow::bail!("Jikan base URL cannot be empty");
        }

        if self.jikan.min_request_interval_ms == 0 {
            anyhow::bail!("jikan.min_request_interval_ms must be > 0");
        }

        if self.jikan.max_retries == 0 {
            anyhow::bail!("jikan.max_retries must be > 0");
        }

        if self.cache.version.is_empty() {
            anyhow::bail!("cache.version cannot be empty");
        }

        if self.cache.ttl_hours <= 0 {
            anyhow::bail!("cache.ttl_hours must be > 0");
        }

        if self.season.total_weeks == 0 {
            anyhow::bail!("season.total_weeks must be > 0");
        }

        if self.ranking.max_in_flight == 0 || self.ranking.max_season_pages == 0 {
            anyhow::bail!("ranking.max_in_flight and ranking.max_season_pages must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.jikan.min_request_interval_ms, 350);
        assert_eq!(config.jikan.max_retries, 3);
        assert_eq!(config.jikan.retry_base_delay_ms, 2000);
        assert_eq!(config.jikan.default_retry_after_secs, 2);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.ranking.min_members, 20_000);
        assert_eq!(config.ranking.max_results, 50);
        assert_eq!(
            config.ranking.episode_pagination,
            PaginationMode::AssumeAppendOnly
        );
        assert_eq!(config.season.epoch.to_string(), "2025-09-29");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[jikan]"));
        assert!(toml_str.contains("[ranking]"));
        assert!(toml_str.contains("episode_pagination = \"assume_append_only\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [season]
            name = "winter"
            year = 2026
            epoch = "2026-01-05"

            [ranking]
            episode_pagination = "full"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.season.name, Season::Winter);
        assert_eq!(config.season.year, 2026);
        assert_eq!(config.season.total_weeks, 13);
        assert_eq!(config.ranking.episode_pagination, PaginationMode::Full);

        assert_eq!(config.jikan.base_url, "https://api.jikan.moe/v4");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.jikan.min_request_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
