//! Manually curated episode facts for episodes the remote API has not
//! published yet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::domain::AnimeId;
use crate::domain::window::WeekWindow;
use crate::models::anime::RemoteTitle;
use crate::models::ranking::RankedEpisode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverrideEntry {
    pub anime_id: AnimeId,
    pub episode: u32,
    pub episode_title: String,
    pub week: u32,
    pub score: f32,
    /// Calendar date (UTC) the episode aired. Defaults to the week start.
    pub aired: Option<NaiveDate>,
}

impl ManualOverrideEntry {
    #[must_use]
    pub fn new(anime_id: i32, episode: u32, episode_title: &str, week: u32, score: f32) -> Self {
        Self {
            anime_id: AnimeId::new(anime_id),
            episode,
            episode_title: episode_title.to_string(),
            week,
            score,
            aired: None,
        }
    }

    #[must_use]
    pub fn aired_on(mut self, date: Option<NaiveDate>) -> Self {
        self.aired = date;
        self
    }

    /// The ranking entry this override stands for, using `title` for display data.
    #[must_use]
    pub fn to_ranked(&self, title: &RemoteTitle, window: &WeekWindow) -> RankedEpisode {
        let aired = self
            .aired
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(window.start, |d| d.and_utc());

        RankedEpisode {
            episode_title: self.episode_title.clone(),
            score: Some(self.score),
            aired,
            manual: true,
            ..RankedEpisode::for_title(title, self.episode)
        }
    }

    fn key(&self) -> (AnimeId, u32, u32) {
        (self.anime_id, self.episode, self.week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideProblem {
    InvalidAnimeId,
    InvalidEpisode,
    WeekOutOfRange,
    ScoreOutOfRange,
    EmptyTitle,
    Duplicate,
}

impl fmt::Display for OverrideProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidAnimeId => "anime id must be positive",
            Self::InvalidEpisode => "episode number must be at least 1",
            Self::WeekOutOfRange => "week is outside the season",
            Self::ScoreOutOfRange => "score must be between 0 and 10",
            Self::EmptyTitle => "episode title is empty",
            Self::Duplicate => "same title, episode and week listed earlier",
        };
        f.write_str(text)
    }
}

/// A problem found in the entry at `index` of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideIssue {
    pub index: usize,
    pub anime_id: AnimeId,
    pub episode: u32,
    pub week: u32,
    pub problem: OverrideProblem,
}

impl fmt::Display for OverrideIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry #{} (anime {}, episode {}, week {}): {}",
            self.index, self.anime_id, self.episode, self.week, self.problem
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    entries: Vec<ManualOverrideEntry>,
}

impl OverrideRegistry {
    #[must_use]
    pub const fn new(entries: Vec<ManualOverrideEntry>) -> Self {
        Self { entries }
    }

    /// The compiled-in list for the Fall 2025 season.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            ManualOverrideEntry::new(61930, 3, "The World's Best", 3, 4.59),
            ManualOverrideEntry::new(60564, 3, "Chestnuts Roasting on an Open Fire", 3, 4.41),
            ManualOverrideEntry::new(54703, 3, "Mizuha", 3, 4.45),
            ManualOverrideEntry::new(
                47158,
                2,
                "The Cousin I Haven't Seen in Years Is Cold to Me",
                2,
                3.97,
            ),
            ManualOverrideEntry::new(
                47158,
                2,
                "Only I Can Be a Pain to My Uncle's Daughter",
                3,
                3.98,
            ),
        ])
    }

    #[must_use]
    pub fn entries(&self) -> &[ManualOverrideEntry] {
        &self.entries
    }

    /// Entries for `week` in list order, each with its index in the registry.
    pub fn for_week(&self, week: u32) -> impl Iterator<Item = (usize, &ManualOverrideEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.week == week)
    }

    /// Every problem found, in list order. An entry may yield several issues.
    #[must_use]
    pub fn validate(&self, total_weeks: u32) -> Vec<OverrideIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let mut report = |problem| {
                issues.push(OverrideIssue {
                    index,
                    anime_id: entry.anime_id,
                    episode: entry.episode,
                    week: entry.week,
                    problem,
                });
            };

            if !entry.anime_id.is_valid() {
                report(OverrideProblem::InvalidAnimeId);
            }
            if entry.episode == 0 {
                report(OverrideProblem::InvalidEpisode);
            }
            if entry.week == 0 || entry.week > total_weeks {
                report(OverrideProblem::WeekOutOfRange);
            }
            if !(0.0..=10.0).contains(&entry.score) {
                report(OverrideProblem::ScoreOutOfRange);
            }
            if entry.episode_title.trim().is_empty() {
                report(OverrideProblem::EmptyTitle);
            }
            if !seen.insert(entry.key()) {
                report(OverrideProblem::Duplicate);
            }
        }

        issues
    }
}
