//! Workspace config files, lowest precedence first:
//! `config/config.toml`, then `config/{STOWAGE_ENV}.toml`

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_SELECTOR: &str = "STOWAGE_ENV";
const DEFAULT_ENV: &str = "development";

/// Candidate workspace files for the active environment, in merge order
pub fn workspace_config_paths(workspace_root: &Path) -> Vec<PathBuf> {
    let env_name = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
    let config_dir = workspace_root.join("config");
    vec![
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(workspace_config_paths(workspace_root)
        .into_iter()
        .filter(|path| path.exists())
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), "Adding workspace configuration");
            builder.add_source(File::from(path.as_path()).required(false))
        }))
}
