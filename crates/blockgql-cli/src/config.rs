use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blockgql_core::BlockGqlConfig;

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".blockgql"))
}

/// `--config` / `BLOCKGQL_CONFIG`, then `~/.blockgql/config.toml`.
pub fn config_path(cli_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        return Ok(path.to_path_buf());
    }
    Ok(config_dir()?.join("config.toml"))
}

pub fn load(path: &Path) -> Result<BlockGqlConfig> {
    BlockGqlConfig::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolves an endpoint argument through the config.
pub fn resolve_endpoint(config: &BlockGqlConfig, arg: Option<&str>) -> Result<String> {
    match config.resolve_endpoint(arg) {
        Some(url) => Ok(url),
        None => anyhow::bail!(
            "No endpoint given. Pass a URL or endpoint name, or set default_endpoint in the config"
        ),
    }
}
