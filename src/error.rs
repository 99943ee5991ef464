//! Error types for the stowage repository layer.

use thiserror::Error;

/// Failures surfaced by an entity store or by commit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key in '{kind}': {key}")]
    DuplicateKey { kind: String, key: String },

    #[error("Record missing from '{kind}': {key}")]
    MissingRecord { kind: String, key: String },

    #[error("Another change for '{kind}' {key} is already staged")]
    AlreadyTracked { kind: String, key: String },

    #[error("Unknown navigation '{navigation}' on '{kind}'")]
    UnknownNavigation { kind: String, navigation: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    /// The batch was applied but could not be flushed to disk
    #[error("Applied batch could not be flushed: {0}")]
    Flush(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(io) => StoreError::Io(io),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Raised when a delete-by-predicate finds nothing to delete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot remove entity not found in '{kind}'")]
pub struct NotFoundError {
    pub kind: String,
}

/// Errors returned by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

/// Malformed include directive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncludeError {
    #[error("Empty navigation segment in '{0}'")]
    EmptySegment(String),

    #[error("Invalid navigation segment '{segment}' in '{path}'")]
    InvalidSegment { path: String, segment: String },

    #[error("then_include('{0}') requires a preceding include")]
    NoParent(String),
}

/// Configuration and logging setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
