//! Domain primitives shared by the acquisition and ranking layers.
//!
//! Identifiers use the Newtype pattern so a MyAnimeList title id can never be
//! confused with an episode ordinal or a week number.

pub mod window;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// MyAnimeList identifier of a title (a single series/season entry).
///
/// # Examples
///
/// ```rust
/// use animerank::domain::AnimeId;
///
/// let id = AnimeId::new(61930);
/// assert_eq!(id.value(), 61930);
/// assert_eq!(id.to_string(), "61930");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AnimeId(i32);

impl AnimeId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// Remote ids are strictly positive; anything else is a configuration typo.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AnimeId> for i32 {
    fn from(id: AnimeId) -> Self {
        id.0
    }
}

impl From<i32> for AnimeId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// Broadcast season, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

#[derive(Debug, Error)]
#[error("Unknown season: {0} (expected winter, spring, summer or fall)")]
pub struct UnknownSeason(pub String);

impl Season {
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Fall];

    /// Lower-case name as used in remote URLs and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// True when `(year, self)` airs strictly after `(other_year, other)`.
    #[must_use]
    pub fn is_after(self, year: i32, other: Self, other_year: i32) -> bool {
        (year, self.index()) > (other_year, other.index())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = UnknownSeason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|season| season.as_str() == lower)
            .ok_or_else(|| UnknownSeason(s.to_string()))
    }
}
