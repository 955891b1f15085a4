//! Weekly ranking command handler

use anyhow::Context;
use chrono::Utc;

use super::{format_score, print_json};
use crate::state::SharedState;

pub async fn cmd_week(state: &SharedState, week: Option<u32>, json: bool) -> anyhow::Result<()> {
    let week = week.unwrap_or_else(|| state.ranking.current_week(Utc::now()));

    let ranking = match state.ranking.rank_week(week).await {
        Ok(ranking) => ranking,
        Err(e) => {
            if !json {
                println!("No episodes ranked for week {week}.");
            }
            return Err(e).with_context(|| format!("Failed to rank week {week}"));
        }
    };

    if json {
        return print_json(&ranking);
    }

    let window = &ranking.window;
    println!(
        "Week {} ({} to {})",
        window.week,
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d")
    );
    println!("{:-<78}", "");

    if ranking.episodes.is_empty() {
        println!("No episodes aired in this window.");
    }

    for (i, ep) in ranking.episodes.iter().enumerate() {
        let manual = if ep.manual { " [manual]" } else { "" };
        println!(
            "{:>3}. {} {} - Ep {}{}",
            i + 1,
            format_score(ep.score),
            ep.anime_title,
            ep.episode_number,
            manual
        );
        println!("       {} | {}", ep.episode_title, ep.aired.format("%Y-%m-%d"));
    }

    if !ranking.failures.is_empty() {
        println!();
        println!("Titles skipped after fetch errors ({}):", ranking.failures.len());
        for failure in &ranking.failures {
            println!("  • {} ({}): {}", failure.title, failure.anime_id, failure.message);
        }
    }

    if !ranking.override_failures.is_empty() {
        println!();
        println!("Manual overrides not applied ({}):", ranking.override_failures.len());
        for failure in &ranking.override_failures {
            println!(
                "  • anime {} ep {}: {}",
                failure.anime_id, failure.episode, failure.message
            );
        }
    }

    Ok(())
}
