//! CLI module - command-line front end for animerank
//!
//! Argument parsing with clap; each command lives in `commands/`.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// animerank - weekly anime episode rankings built from Jikan data
#[derive(Parser)]
#[command(name = "animerank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of a text table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank the episodes of one week of the configured season
    #[command(alias = "w")]
    Week {
        /// Week number (defaults to the current week)
        week: Option<u32>,
    },

    /// List the configured season's titles above the popularity threshold
    #[command(alias = "s")]
    Season,

    /// Most followed titles of a season, or of every season after spring 2026
    #[command(alias = "a")]
    Anticipated {
        /// Season name (winter, spring, summer, fall) or "later"
        season: String,
        /// Year of the season (not used with "later")
        year: Option<i32>,
    },

    /// List and validate the built-in manual overrides
    #[command(alias = "o")]
    Overrides,

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove one key, or every entry written by animerank
    Clear {
        /// Exact cache key to remove
        key: Option<String>,
    },
    /// Wipe the whole cache table
    ClearAll,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with the default settings
    Init,
}

pub use commands::*;
