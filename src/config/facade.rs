//! Configuration loading facade

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{env, global_file, workspace_file};
use super::StowageConfig;
use crate::error::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Loads [`StowageConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace: defaults, global file,
    /// workspace files, environment
    pub fn load(workspace_root: &Path) -> Result<StowageConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        Self::finish(workspace_root, builder)
    }

    /// Like [`ConfigLoader::load`] without the per-user global file
    pub fn load_workspace(workspace_root: &Path) -> Result<StowageConfig, ConfigError> {
        Self::finish(workspace_root, builder_with_defaults()?)
    }

    /// Load a single config file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<StowageConfig, ConfigError> {
        let config = builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<StowageConfig>()?;
        Self::validated(config)
    }

    fn finish(
        workspace_root: &Path,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<StowageConfig, ConfigError> {
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);
        let config = builder.build()?.try_deserialize::<StowageConfig>()?;
        debug!(
            workspace = %workspace_root.display(),
            backend = ?config.store.backend,
            "Configuration loaded"
        );
        Self::validated(config)
    }

    fn validated(config: StowageConfig) -> Result<StowageConfig, ConfigError> {
        config
            .validate()
            .map_err(|errors| ConfigError::Invalid(errors.join("; ")))?;
        Ok(config)
    }
}
