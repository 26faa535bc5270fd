//! Configuration lookup for the GQ CLI
//!
//! Config file location: ~/.gq/config.toml, unless `--config` or `GQ_CONFIG`
//! names another file.

use anyhow::{Context, Result};
use gq_core::GqConfig;
use std::path::{Path, PathBuf};

/// Get config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .context("Could not determine home directory")?
        .home_dir()
        .to_path_buf();

    Ok(home.join(".gq"))
}

/// Get default config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration from an explicit path, the environment, or the default location
pub fn load(explicit: Option<&Path>) -> Result<GqConfig> {
    if let Some(path) = explicit {
        return GqConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {:?}", path));
    }

    if std::env::var_os("GQ_CONFIG").is_none() {
        let default_path = config_path()?;
        if default_path.exists() {
            return GqConfig::from_file(&default_path)
                .with_context(|| format!("Failed to load config file: {:?}", default_path));
        }
    }

    GqConfig::from_env().context("Failed to load configuration from environment")
}
