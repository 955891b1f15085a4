//! Wire shapes of the Jikan v4 API. The same structs are written to the cache,
//! so every field round-trips through serde unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::window::parse_air_timestamp;
use crate::domain::{AnimeId, Season};

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub last_visible_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
}

const fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            last_visible_page: first_page(),
            has_next_page: false,
        }
    }
}

/// One page of a paginated collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(
        deserialize_with = "null_as_empty",
        bound(deserialize = "T: Deserialize<'de>")
    )]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl<T> Page<T> {
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pagination.has_next_page
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub jpg: ImageUrls,
    #[serde(default)]
    pub webp: ImageUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub mal_id: i32,
    pub name: String,
}

/// A show/season entry as listed by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTitle {
    pub mal_id: AnimeId,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    #[serde(default)]
    pub aired: Aired,
    pub score: Option<f32>,
    pub members: Option<u64>,
    pub synopsis: Option<String>,
    pub season: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub studios: Vec<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genres: Vec<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub demographics: Vec<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub themes: Vec<NamedEntry>,
}

impl RemoteTitle {
    /// English title when the remote has one, the default title otherwise.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title_english
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.images
            .webp
            .large_image_url
            .as_deref()
            .or(self.images.jpg.large_image_url.as_deref())
            .or(self.images.jpg.image_url.as_deref())
    }

    #[must_use]
    pub fn members(&self) -> u64 {
        self.members.unwrap_or(0)
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        self.anime_type.as_deref().unwrap_or("TV")
    }

    #[must_use]
    pub fn parsed_season(&self) -> Option<Season> {
        self.season.as_deref().and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn genre_names(&self) -> Vec<String> {
        names(&self.genres)
    }

    #[must_use]
    pub fn theme_names(&self) -> Vec<String> {
        names(&self.themes)
    }

    #[must_use]
    pub fn demographic_names(&self) -> Vec<String> {
        names(&self.demographics)
    }

    #[must_use]
    pub fn studio_names(&self) -> Vec<String> {
        names(&self.studios)
    }
}

fn names(entries: &[NamedEntry]) -> Vec<String> {
    entries.iter().map(|e| e.name.clone()).collect()
}

/// One episode of a title. `mal_id` is the episode ordinal, not a global id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEpisode {
    pub mal_id: u32,
    pub url: Option<String>,
    pub title: Option<String>,
    pub aired: Option<String>,
    pub score: Option<f32>,
    #[serde(default)]
    pub filler: bool,
    #[serde(default)]
    pub recap: bool,
    pub forum_url: Option<String>,
}

impl RemoteEpisode {
    /// `None` when the air date is missing or unparseable.
    #[must_use]
    pub fn aired_at(&self) -> Option<DateTime<Utc>> {
        self.aired.as_deref().and_then(parse_air_timestamp)
    }
}
