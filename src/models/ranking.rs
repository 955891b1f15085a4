use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::constants::{MAL_ANIME_URL, limits::MAL_EPISODES_PER_PAGE};
use crate::domain::AnimeId;
use crate::models::anime::{RemoteEpisode, RemoteTitle};

/// The unit of a weekly ranking: one episode standing in for its title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEpisode {
    pub anime_id: AnimeId,
    pub anime_title: String,
    pub episode_number: u32,
    pub episode_title: String,
    pub score: Option<f32>,
    pub image_url: Option<String>,
    pub aired: DateTime<Utc>,
    pub anime_type: String,
    pub demographics: Vec<String>,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub url: String,
    pub forum_url: Option<String>,
    pub manual: bool,
}

impl RankedEpisode {
    #[must_use]
    pub fn from_remote(title: &RemoteTitle, episode: &RemoteEpisode, aired: DateTime<Utc>) -> Self {
        let episode_title = episode
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Episode {}", episode.mal_id));

        Self {
            episode_number: episode.mal_id,
            episode_title,
            score: episode.score,
            aired,
            forum_url: episode.forum_url.clone(),
            manual: false,
            ..Self::for_title(title, episode.mal_id)
        }
    }

    /// Title-level fields filled in, episode-level fields left for the caller.
    #[must_use]
    pub fn for_title(title: &RemoteTitle, episode_number: u32) -> Self {
        Self {
            anime_id: title.mal_id,
            anime_title: title.display_title().to_string(),
            episode_number,
            episode_title: format!("Episode {episode_number}"),
            score: None,
            image_url: title.image_url().map(str::to_string),
            aired: DateTime::<Utc>::default(),
            anime_type: title.kind().to_string(),
            demographics: title.demographic_names(),
            genres: title.genre_names(),
            themes: title.theme_names(),
            url: episode_page_url(title.mal_id, episode_number, title.episodes),
            forum_url: None,
            manual: false,
        }
    }

    /// Strictly higher score. A scored episode outranks an unscored one.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        score_key(self.score) > score_key(other.score)
    }
}

fn score_key(score: Option<f32>) -> f32 {
    score.unwrap_or(f32::NEG_INFINITY)
}

/// Descending by score, unscored last. Stable with `sort_by`.
#[must_use]
pub fn by_score_desc(a: &RankedEpisode, b: &RankedEpisode) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// MyAnimeList pages episode lists by 100, so late episodes of long series
/// live behind an offset.
#[must_use]
pub fn episode_page_url(anime_id: AnimeId, episode: u32, total_episodes: Option<u32>) -> String {
    let base = format!("{MAL_ANIME_URL}/{anime_id}/episode");

    if total_episodes.unwrap_or(0) > MAL_EPISODES_PER_PAGE && episode > MAL_EPISODES_PER_PAGE {
        let page = episode.div_ceil(MAL_EPISODES_PER_PAGE);
        let offset = (page - 1) * MAL_EPISODES_PER_PAGE;
        return format!("{base}?offset={offset}");
    }

    base
}

/// A title as presented in season/anticipated listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnticipatedAnime {
    pub id: AnimeId,
    pub title: String,
    pub image_url: Option<String>,
    pub score: Option<f32>,
    pub members: u64,
    pub synopsis: String,
    pub anime_type: String,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub demographics: Vec<String>,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub studios: Vec<String>,
    pub url: String,
}

impl From<&RemoteTitle> for AnticipatedAnime {
    fn from(title: &RemoteTitle) -> Self {
        Self {
            id: title.mal_id,
            title: title.display_title().to_string(),
            image_url: title.image_url().map(str::to_string),
            score: title.score,
            members: title.members(),
            synopsis: title.synopsis.clone().unwrap_or_default(),
            anime_type: title.kind().to_string(),
            season: title.season.clone(),
            year: title.year,
            demographics: title.demographic_names(),
            genres: title.genre_names(),
            themes: title.theme_names(),
            studios: title.studio_names(),
            url: title
                .url
                .clone()
                .unwrap_or_else(|| format!("{MAL_ANIME_URL}/{}", title.mal_id)),
        }
    }
}
