pub const JIKAN_API: &str = "https://api.jikan.moe/v4";

pub const MAL_ANIME_URL: &str = "https://myanimelist.net/anime";

pub mod cache {

    /// Bumped whenever the pipeline's output semantics change so that entries
    /// written by an older build are never read again.
    pub const VERSION: &str = "v3";

    pub const TTL_HOURS: i64 = 24;

    /// Prefixes written by earlier builds. `clear(None)` removes these along
    /// with the configured version's own namespace.
    pub const LEGACY_PREFIXES: &[&str] = &["v", "jikan_", "anime_"];
}

pub mod intervals {
    use std::time::Duration;

    pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(350);

    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

    pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);
}

pub mod limits {

    pub const MAX_ATTEMPTS: u32 = 3;

    pub const MAX_THROTTLE_WAITS: u32 = 10;

    pub const MIN_MEMBERS: u64 = 20_000;

    pub const MAX_RANKED_EPISODES: usize = 50;

    pub const MAX_ANTICIPATED: usize = 20;

    pub const MAX_SEASON_PAGES: u32 = 10;

    pub const MAX_EPISODE_PAGES: u32 = 10;

    /// MyAnimeList lists episodes in pages of this size.
    pub const MAL_EPISODES_PER_PAGE: u32 = 100;
}

pub mod anticipated {
    use crate::domain::Season;

    /// "Later" lists upcoming titles airing after this season.
    pub const LATER_AFTER_SEASON: Season = Season::Spring;

    pub const LATER_AFTER_YEAR: i32 = 2026;
}
