mod anticipated;
mod cache;
mod config;
mod overrides;
mod season;
mod week;

pub use anticipated::cmd_anticipated;
pub use cache::{cmd_cache_clear, cmd_cache_clear_all};
pub use config::cmd_config_init;
pub use overrides::cmd_overrides;
pub use season::cmd_season;
pub use week::cmd_week;

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_score(score: Option<f32>) -> String {
    score.map_or_else(|| " N/A".to_string(), |s| format!("{s:>4.2}"))
}
