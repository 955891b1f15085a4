use anyhow::{Context, bail};

use super::{format_score, print_json};
use crate::constants::anticipated::{LATER_AFTER_SEASON, LATER_AFTER_YEAR};
use crate::domain::Season;
use crate::services::SeasonQuery;
use crate::state::SharedState;

fn parse_query(season: &str, year: Option<i32>) -> anyhow::Result<SeasonQuery> {
    if season.eq_ignore_ascii_case("later") {
        return Ok(SeasonQuery::Later {
            after_season: LATER_AFTER_SEASON,
            after_year: LATER_AFTER_YEAR,
        });
    }

    let season: Season = season.parse()?;
    let Some(year) = year else {
        bail!("A year is required, e.g. `animerank anticipated {season} 2026`");
    };

    Ok(SeasonQuery::Season { season, year })
}

pub async fn cmd_anticipated(
    state: &SharedState,
    season: &str,
    year: Option<i32>,
    json: bool,
) -> anyhow::Result<()> {
    let query = parse_query(season, year)?;
    let listing = state
        .anticipated
        .anticipated(query)
        .await
        .context("Failed to fetch anticipated titles")?;

    if json {
        return print_json(&listing);
    }

    match query {
        SeasonQuery::Season { season, year } => println!("Most anticipated: {season} {year}"),
        SeasonQuery::Later {
            after_season,
            after_year,
        } => println!("Most anticipated: after {after_season} {after_year}"),
    }
    println!("{:-<78}", "");

    if listing.is_empty() {
        println!("No titles found.");
        return Ok(());
    }

    for (i, anime) in listing.iter().enumerate() {
        let studios = if anime.studios.is_empty() {
            "Unknown studio".to_string()
        } else {
            anime.studios.join(", ")
        };
        println!("{:>3}. {} ({} members)", i + 1, anime.title, anime.members);
        println!(
            "     {} | {} | score {}",
            anime.anime_type,
            studios,
            format_score(anime.score).trim()
        );
    }

    Ok(())
}
