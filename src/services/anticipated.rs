use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::clients::jikan::JikanError;
use crate::constants::limits::MAX_ANTICIPATED;
use crate::domain::Season;
use crate::models::anime::RemoteTitle;
use crate::models::ranking::AnticipatedAnime;
use crate::services::acquisition::Acquisition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeasonQuery {
    Season { season: Season, year: i32 },
    /// Upcoming titles airing strictly after the given season.
    Later { after_season: Season, after_year: i32 },
}

pub struct AnticipatedService {
    acquisition: Arc<Acquisition>,
    max_results: usize,
}

impl AnticipatedService {
    #[must_use]
    pub const fn new(acquisition: Arc<Acquisition>) -> Self {
        Self {
            acquisition,
            max_results: MAX_ANTICIPATED,
        }
    }

    /// Most followed titles matching `query`.
    pub async fn anticipated(
        &self,
        query: SeasonQuery,
    ) -> Result<Vec<AnticipatedAnime>, JikanError> {
        let titles = match query {
            SeasonQuery::Season { season, year } => {
                match self.acquisition.season_titles(year, season).await {
                    Ok(titles) => titles,
                    Err(e) => {
                        warn!(
                            year,
                            %season,
                            error = %e,
                            "Season listing unavailable, falling back to upcoming listing"
                        );
                        self.acquisition
                            .upcoming_titles()
                            .await?
                            .into_iter()
                            .filter(|t| t.parsed_season() == Some(season) && t.year == Some(year))
                            .collect()
                    }
                }
            }
            SeasonQuery::Later {
                after_season,
                after_year,
            } => self
                .acquisition
                .upcoming_titles()
                .await?
                .into_iter()
                .filter(|t| airs_after(t, after_season, after_year))
                .collect(),
        };

        Ok(most_followed(titles, self.max_results))
    }
}

/// Titles without a year never qualify. A title in `after_year` with no season
/// does not either.
fn airs_after(title: &RemoteTitle, after_season: Season, after_year: i32) -> bool {
    match title.year {
        Some(year) if year > after_year => true,
        Some(year) if year == after_year => title
            .parsed_season()
            .is_some_and(|season| season.is_after(year, after_season, after_year)),
        _ => false,
    }
}

fn most_followed(mut titles: Vec<RemoteTitle>, max_results: usize) -> Vec<AnticipatedAnime> {
    titles.sort_by_key(|t| std::cmp::Reverse(t.members()));
    titles
        .iter()
        .take(max_results)
        .map(AnticipatedAnime::from)
        .collect()
}
