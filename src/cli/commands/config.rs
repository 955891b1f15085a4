use std::path::Path;

use crate::config::Config;

pub fn cmd_config_init(path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) if path.exists() => {
            println!("Config already exists at {}", path.display());
        }
        Some(path) => {
            Config::default().save_to_path(path)?;
            println!("Wrote default config to {}", path.display());
        }
        None => {
            if Config::create_default_if_missing()? {
                println!("Wrote default config to config.toml");
            } else {
                println!("Config already exists.");
            }
        }
    }

    Ok(())
}
