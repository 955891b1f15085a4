pub mod cache_key;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use cache_key::CacheKeys;
use cli::{CacheCommands, Cli, Commands, ConfigCommands};
pub use config::Config;
use db::Store;
use state::SharedState;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `general.log_level`.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so `--json` output on stdout stays parseable.
    if config.general.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    config.validate()?;
    debug!(season = %config.season.name, year = config.season.year, "Configuration loaded");

    match cli.command {
        Commands::Config {
            command: ConfigCommands::Init,
        } => cli::cmd_config_init(cli.config.as_deref()),

        Commands::Cache { command } => {
            let store = Store::new(&config.general.database_path)
                .await?
                .with_cache_keys(&CacheKeys::new(config.cache.version.clone()));
            match command {
                CacheCommands::Clear { key } => cli::cmd_cache_clear(&store, key.as_deref()).await,
                CacheCommands::ClearAll => cli::cmd_cache_clear_all(&store).await,
            }
        }

        command => {
            let state = SharedState::new(config).await?;
            match command {
                Commands::Week { week } => cli::cmd_week(&state, week, cli.json).await,
                Commands::Season => cli::cmd_season(&state, cli.json).await,
                Commands::Anticipated { season, year } => {
                    cli::cmd_anticipated(&state, &season, year, cli.json).await
                }
                Commands::Overrides => cli::cmd_overrides(&state, cli.json),
                Commands::Cache { .. } | Commands::Config { .. } => Ok(()),
            }
        }
    }
}
