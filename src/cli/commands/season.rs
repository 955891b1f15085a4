use anyhow::Context;

use super::{format_score, print_json};
use crate::models::ranking::AnticipatedAnime;
use crate::services::ranking::popular_titles;
use crate::state::SharedState;

pub async fn cmd_season(state: &SharedState, json: bool) -> anyhow::Result<()> {
    let season = &state.config.season;
    let titles = state
        .acquisition
        .season_titles(season.year, season.name)
        .await
        .with_context(|| format!("Failed to fetch {} {}", season.name, season.year))?;

    let mut popular = popular_titles(&titles, state.config.ranking.min_members);
    popular.sort_by_key(|t| std::cmp::Reverse(t.members()));
    let listing: Vec<AnticipatedAnime> = popular.iter().map(AnticipatedAnime::from).collect();

    if json {
        return print_json(&listing);
    }

    println!(
        "{} {} ({} of {} titles with at least {} members)",
        season.name,
        season.year,
        listing.len(),
        titles.len(),
        state.config.ranking.min_members
    );
    println!("{:-<78}", "");

    for anime in &listing {
        println!(
            "{} {:>9} {} [{}]",
            format_score(anime.score),
            anime.members,
            anime.title,
            anime.anime_type
        );
    }

    Ok(())
}
