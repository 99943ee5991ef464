//! Configuration System
//!
//! Layered configuration for opening a store and setting up logging.
//! Sources, lowest precedence first: built-in defaults, the global config
//! file, workspace config files, then `STOWAGE__SECTION__FIELD` environment
//! variables.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StowageConfig {
    /// Store backing the context
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which store implementation a context opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sled,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database directory (sled only)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Flush to disk after every commit (sled only)
    #[serde(default = "default_true")]
    pub flush_on_commit: bool,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".stowage/store")
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            flush_on_commit: default_true(),
        }
    }
}

impl StoreConfig {
    /// Validate store configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::Sled && self.path.as_os_str().is_empty() {
            return Err("store.path must be set for the sled backend".to_string());
        }
        Ok(())
    }
}

impl StowageConfig {
    /// Validate the full configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Err(e) = self.store.validate() {
            errors.push(e);
        }
        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
