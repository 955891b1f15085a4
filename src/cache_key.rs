//! Versioned cache key namespace.
//!
//! Keys are `{version}_{query}_{params...}`. Pagination ceilings and the
//! episode pagination mode are part of the key so that results gathered under
//! different limits never alias each other.

use crate::config::PaginationMode;
use crate::constants::cache::LEGACY_PREFIXES;
use crate::domain::{AnimeId, Season};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    version: String,
}

impl CacheKeys {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Every prefix a bulk clear removes: this namespace and the legacy ones.
    #[must_use]
    pub fn owned_prefixes(&self) -> Vec<String> {
        std::iter::once(format!("{}_", self.version))
            .chain(LEGACY_PREFIXES.iter().map(|p| (*p).to_string()))
            .collect()
    }

    #[must_use]
    pub fn season(&self, year: i32, season: Season, max_pages: u32) -> String {
        format!("{}_season_{year}_{season}_p{max_pages}", self.version)
    }

    #[must_use]
    pub fn upcoming(&self, max_pages: u32) -> String {
        format!("{}_upcoming_p{max_pages}", self.version)
    }

    #[must_use]
    pub fn anime(&self, id: AnimeId) -> String {
        format!("{}_anime_{id}", self.version)
    }

    #[must_use]
    pub fn episodes(&self, id: AnimeId, mode: PaginationMode) -> String {
        format!("{}_episodes_{id}_{}", self.version, mode.cache_tag())
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(crate::constants::cache::VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_version_and_params() {
        let keys = CacheKeys::new("v3");
        assert_eq!(keys.season(2025, Season::Fall, 10), "v3_season_2025_fall_p10");
        assert_eq!(keys.upcoming(4), "v3_upcoming_p4");
        assert_eq!(keys.anime(AnimeId::new(52991)), "v3_anime_52991");
        assert_eq!(
            keys.episodes(AnimeId::new(21), PaginationMode::AssumeAppendOnly),
            "v3_episodes_21_tail"
        );
        assert_eq!(
            keys.episodes(AnimeId::new(21), PaginationMode::Full),
            "v3_episodes_21_all"
        );
    }

    #[test]
    fn bumping_version_changes_every_key() {
        let old = CacheKeys::new("v2");
        let new = CacheKeys::new("v3");
        assert_ne!(old.anime(AnimeId::new(1)), new.anime(AnimeId::new(1)));
        assert_ne!(old.upcoming(10), new.upcoming(10));
    }

    #[test]
    fn owned_prefixes_follow_configured_version() {
        let keys = CacheKeys::new("fall2025");
        let prefixes = keys.owned_prefixes();
        assert_eq!(prefixes[0], "fall2025_");
        assert!(prefixes.iter().any(|p| p == "jikan_"));

        let key = keys.anime(AnimeId::new(1));
        assert!(prefixes.iter().any(|p| key.starts_with(p.as_str())));
    }
}
