use serde::Serialize;

use super::print_json;
use crate::services::{ManualOverrideEntry, OverrideIssue};
use crate::state::SharedState;

#[derive(Serialize)]
struct OverridesReport<'a> {
    entries: &'a [ManualOverrideEntry],
    issues: Vec<OverrideIssue>,
}

pub fn cmd_overrides(state: &SharedState, json: bool) -> anyhow::Result<()> {
    let entries = state.overrides.entries();
    let issues = state.overrides.validate(state.config.season.total_weeks);

    if json {
        return print_json(&OverridesReport { entries, issues });
    }

    println!("Manual overrides ({} total)", entries.len());
    println!("{:-<78}", "");

    for (i, entry) in entries.iter().enumerate() {
        let aired = entry
            .aired
            .map_or_else(|| "week start".to_string(), |d| d.to_string());
        println!(
            "#{i:<2} week {:>2} | anime {:>6} ep {:>3} | {:.2} | {} ({aired})",
            entry.week, entry.anime_id, entry.episode, entry.score, entry.episode_title
        );
    }

    println!();
    if issues.is_empty() {
        println!("All overrides are valid.");
    } else {
        println!("Problems ({}):", issues.len());
        for issue in &issues {
            println!("  • {issue}");
        }
    }

    Ok(())
}
