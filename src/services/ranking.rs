//! Weekly episode ranking.
//!
//! A week's ranking holds at most one episode per title: the best-scored
//! episode of that title that aired inside the week window, possibly replaced
//! or supplied by a manual override.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clients::jikan::JikanError;
use crate::config::Config;
use crate::domain::window::{SeasonCalendar, WeekWindow};
use crate::domain::{AnimeId, Season};
use crate::models::anime::RemoteTitle;
use crate::models::ranking::{RankedEpisode, by_score_desc};
use crate::services::acquisition::{Acquisition, AcquisitionFailure, TitleEpisodes};
use crate::services::overrides::{ManualOverrideEntry, OverrideRegistry};

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Week {week} is outside the season (1-{total})")]
    InvalidWeek { week: u32, total: u32 },

    #[error("Season listing unavailable: {0}")]
    SeasonUnavailable(#[source] JikanError),
}

/// An override that could not be placed in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideFailure {
    pub anime_id: AnimeId,
    pub episode: u32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekRanking {
    pub window: WeekWindow,
    pub episodes: Vec<RankedEpisode>,
    pub failures: Vec<AcquisitionFailure>,
    pub override_failures: Vec<OverrideFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    Inserted,
    Replaced,
    /// The title already ranks this very episode from the API.
    SameEpisode,
    /// The title's ranked episode scores at least as high.
    Outscored,
}

#[derive(Debug, Clone, Copy)]
pub struct RankingSettings {
    pub season: Season,
    pub year: i32,
    pub calendar: SeasonCalendar,
    pub min_members: u64,
    pub max_results: usize,
}

impl From<&Config> for RankingSettings {
    fn from(config: &Config) -> Self {
        Self {
            season: config.season.name,
            year: config.season.year,
            calendar: config.season.calendar(),
            min_members: config.ranking.min_members,
            max_results: config.ranking.max_results,
        }
    }
}

pub struct RankingEngine {
    acquisition: Arc<Acquisition>,
    overrides: OverrideRegistry,
    settings: RankingSettings,
}

impl RankingEngine {
    #[must_use]
    pub const fn new(
        acquisition: Arc<Acquisition>,
        overrides: OverrideRegistry,
        settings: RankingSettings,
    ) -> Self {
        Self {
            acquisition,
            overrides,
            settings,
        }
    }

    /// Week of the configured season that `now` falls in.
    #[must_use]
    pub fn current_week(&self, now: DateTime<Utc>) -> u32 {
        self.settings.calendar.week_containing(now)
    }

    pub async fn rank_week(&self, week: u32) -> Result<WeekRanking, RankingError> {
        let calendar = self.settings.calendar;
        let window = calendar
            .window(week)
            .ok_or(RankingError::InvalidWeek {
                week,
                total: calendar.total_weeks(),
            })?;

        let season_titles = self
            .acquisition
            .season_titles(self.settings.year, self.settings.season)
            .await
            .map_err(RankingError::SeasonUnavailable)?;

        let popular = popular_titles(&season_titles, self.settings.min_members);
        debug!(
            week,
            total = season_titles.len(),
            popular = popular.len(),
            "Filtered season by popularity"
        );

        let acquired = self.acquisition.episodes_for_titles(&popular).await;
        if !acquired.is_complete() {
            warn!(
                week,
                failed = acquired.failures.len(),
                "Ranking without episode data for some titles"
            );
        }

        let mut ranked = best_per_title(episodes_in_window(&acquired.items, &window));
        let override_failures = self
            .merge_overrides(&mut ranked, &window, &season_titles)
            .await;
        let episodes = sort_and_truncate(ranked, self.settings.max_results);

        info!(
            week,
            count = episodes.len(),
            failures = acquired.failures.len(),
            override_failures = override_failures.len(),
            "Computed weekly ranking"
        );

        Ok(WeekRanking {
            window,
            episodes,
            failures: acquired.failures,
            override_failures,
        })
    }

    async fn merge_overrides(
        &self,
        ranked: &mut Vec<RankedEpisode>,
        window: &WeekWindow,
        season_titles: &[RemoteTitle],
    ) -> Vec<OverrideFailure> {
        let invalid: HashSet<usize> = self
            .overrides
            .validate(self.settings.calendar.total_weeks())
            .into_iter()
            .map(|issue| {
                warn!(%issue, "Skipping invalid manual override");
                issue.index
            })
            .collect();

        let mut failures = Vec::new();

        for (index, entry) in self.overrides.for_week(window.week) {
            if invalid.contains(&index) {
                continue;
            }

            let title = match self.override_title(entry, season_titles).await {
                Ok(title) => title,
                Err(e) => {
                    warn!(
                        anime_id = %entry.anime_id,
                        episode = entry.episode,
                        error = %e,
                        "Manual override has no title data, skipping"
                    );
                    failures.push(OverrideFailure {
                        anime_id: entry.anime_id,
                        episode: entry.episode,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = apply_override(ranked, entry.to_ranked(&title, window));
            debug!(
                anime_id = %entry.anime_id,
                episode = entry.episode,
                ?outcome,
                "Merged manual override"
            );
        }

        failures
    }

    async fn override_title(
        &self,
        entry: &ManualOverrideEntry,
        season_titles: &[RemoteTitle],
    ) -> Result<RemoteTitle, JikanError> {
        if let Some(title) = season_titles.iter().find(|t| t.mal_id == entry.anime_id) {
            return Ok(title.clone());
        }
        self.acquisition.title(entry.anime_id).await
    }
}

#[must_use]
pub fn popular_titles(titles: &[RemoteTitle], min_members: u64) -> Vec<RemoteTitle> {
    titles
        .iter()
        .filter(|t| t.members() >= min_members)
        .cloned()
        .collect()
}

/// Episodes with a parseable air timestamp inside `window`, in input order.
#[must_use]
pub fn episodes_in_window(acquired: &[TitleEpisodes], window: &WeekWindow) -> Vec<RankedEpisode> {
    acquired
        .iter()
        .flat_map(|te| {
            te.episodes.iter().filter_map(move |episode| {
                let aired = episode.aired_at()?;
                window
                    .contains(aired)
                    .then(|| RankedEpisode::from_remote(&te.title, episode, aired))
            })
        })
        .collect()
}

/// One entry per title: the strictly highest score wins, ties keep the
/// earlier candidate. Titles keep first-seen order.
#[must_use]
pub fn best_per_title(candidates: Vec<RankedEpisode>) -> Vec<RankedEpisode> {
    let mut best: Vec<RankedEpisode> = Vec::new();
    let mut slot: HashMap<AnimeId, usize> = HashMap::new();

    for candidate in candidates {
        match slot.get(&candidate.anime_id) {
            Some(&i) => {
                if candidate.outranks(&best[i]) {
                    best[i] = candidate;
                }
            }
            None => {
                slot.insert(candidate.anime_id, best.len());
                best.push(candidate);
            }
        }
    }

    best
}

/// Places an override. The API's entry stays when it is the same episode or
/// scores at least as high.
pub fn apply_override(ranked: &mut Vec<RankedEpisode>, manual: RankedEpisode) -> OverrideOutcome {
    let Some(existing) = ranked.iter_mut().find(|e| e.anime_id == manual.anime_id) else {
        ranked.push(manual);
        return OverrideOutcome::Inserted;
    };

    if existing.episode_number == manual.episode_number {
        OverrideOutcome::SameEpisode
    } else if manual.outranks(existing) {
        *existing = manual;
        OverrideOutcome::Replaced
    } else {
        OverrideOutcome::Outscored
    }
}

#[must_use]
pub fn sort_and_truncate(mut ranked: Vec<RankedEpisode>, max_results: usize) -> Vec<RankedEpisode> {
    ranked.sort_by(by_score_desc);
    ranked.truncate(max_results);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::anime::RemoteEpisode;
    use chrono::TimeZone;

    fn title(id: i32, members: u64) -> RemoteTitle {
        serde_json::from_value(serde_json::json!({
            "mal_id": id,
            "title": format!("Title {id}"),
            "type": "TV",
            "episodes": 12,
            "members": members
        }))
        .unwrap()
    }

    fn episode(number: u32, aired: Option<&str>, score: Option<f32>) -> RemoteEpisode {
        RemoteEpisode {
            mal_id: number,
            url: None,
            title: Some(format!("Ep {number}")),
            aired: aired.map(str::to_string),
            score,
            filler: false,
            recap: false,
            forum_url: None,
        }
    }

    fn ranked(id: i32, number: u32, score: Option<f32>) -> RankedEpisode {
        RankedEpisode {
            score,
            ..RankedEpisode::for_title(&title(id, 50_000), number)
        }
    }

    fn week_one() -> WeekWindow {
        SeasonCalendar::new(chrono::NaiveDate::from_ymd_opt(2025, 9, 29).unwrap(), 13)
            .window(1)
            .unwrap()
    }

    #[test]
    fn popularity_threshold_is_inclusive() {
        let titles = vec![title(1, 19_999), title(2, 20_000), title(3, 500_000)];
        let ids: Vec<i32> = popular_titles(&titles, 20_000)
            .iter()
            .map(|t| t.mal_id.value())
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn window_filter_drops_missing_unparseable_and_outside_dates() {
        let acquired = vec![TitleEpisodes {
            title: title(1, 50_000),
            episodes: vec![
                episode(1, Some("2025-09-28T23:59:59+00:00"), Some(4.0)),
                episode(2, Some("2025-09-29T00:00:00+00:00"), Some(4.1)),
                episode(3, Some("2025-10-05"), Some(4.2)),
                episode(4, Some("2025-10-06T00:00:00+00:00"), Some(4.3)),
                episode(5, None, Some(4.4)),
                episode(6, Some("soon"), Some(4.5)),
            ],
        }];

        let numbers: Vec<u32> = episodes_in_window(&acquired, &week_one())
            .iter()
            .map(|e| e.episode_number)
            .collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn dedup_keeps_highest_score() {
        let best = best_per_title(vec![ranked(9, 1, Some(7.2)), ranked(9, 2, Some(7.9))]);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].episode_number, 2);
        assert_eq!(best[0].score, Some(7.9));
    }

    #[test]
    fn dedup_tie_keeps_first_and_scored_beats_unscored() {
        let best = best_per_title(vec![
            ranked(1, 1, Some(4.0)),
            ranked(1, 2, Some(4.0)),
            ranked(2, 1, None),
            ranked(2, 2, Some(1.0)),
        ]);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].episode_number, 1);
        assert_eq!(best[1].episode_number, 2);
    }

    #[test]
    fn override_same_episode_keeps_api_entry() {
        let mut list = vec![ranked(5, 3, Some(3.0))];
        let mut manual = ranked(5, 3, Some(4.8));
        manual.manual = true;

        assert_eq!(apply_override(&mut list, manual), OverrideOutcome::SameEpisode);
        assert_eq!(list[0].score, Some(3.0));
        assert!(!list[0].manual);
    }

    #[test]
    fn override_other_episode_replaces_only_when_strictly_higher() {
        let mut list = vec![ranked(5, 3, Some(4.0))];

        let mut equal = ranked(5, 4, Some(4.0));
        equal.manual = true;
        assert_eq!(apply_override(&mut list, equal), OverrideOutcome::Outscored);
        assert_eq!(list[0].episode_number, 3);

        let mut higher = ranked(5, 4, Some(4.5));
        higher.manual = true;
        assert_eq!(apply_override(&mut list, higher), OverrideOutcome::Replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].episode_number, 4);
        assert!(list[0].manual);
    }

    #[test]
    fn override_for_absent_title_is_inserted() {
        let mut list = vec![ranked(1, 1, Some(4.0))];
        let mut manual = ranked(2, 1, Some(3.0));
        manual.manual = true;
        assert_eq!(apply_override(&mut list, manual), OverrideOutcome::Inserted);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn sort_and_truncate_orders_by_score() {
        let list: Vec<_> = (1..=60)
            .map(|i| ranked(i, 1, Some(f32::from(u8::try_from(i).unwrap()) / 10.0)))
            .chain(std::iter::once(ranked(100, 1, None)))
            .collect();

        let top = sort_and_truncate(list, 50);
        assert_eq!(top.len(), 50);
        assert_eq!(top[0].anime_id, AnimeId::new(60));
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(top.iter().all(|e| e.score.is_some()));
    }

    #[test]
    fn window_start_instant_is_inside() {
        let window = week_one();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 9, 29, 0, 0, 0).unwrap());
    }
}
