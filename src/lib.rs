//! Stowage: Generic Repository Data Access
//!
//! A typed repository layer over a pluggable entity store. A
//! [`DatabaseContext`] hands out entity collections that share one pending
//! change set; an [`EntityRepository`] reads through composable, lazily
//! evaluated queries with eager navigation loading, and commits the shared
//! change set after every mutation.

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod include;
pub mod logging;
pub mod query;
pub mod repository;
pub mod store;
pub mod types;

pub use cancel::Cancellation;
pub use crate::config::{ConfigLoader, StoreBackend, StoreConfig, StowageConfig};
pub use context::{DatabaseContext, EntitySet, StoreContext};
pub use error::{ConfigError, IncludeError, NotFoundError, RepositoryError, StoreError};
pub use include::{Include, NavigationPath};
pub use logging::{init_logging, LoggingConfig};
pub use query::{Predicate, Query, Related};
pub use repository::{EntityRepository, Repository};
pub use store::{Change, ChangeBatch, ChangeOp, MemoryStore, SledStore, Store};
pub use types::{Entity, EntityKey};

/// Re-exported so entity types can implement [`Entity`] with async
/// navigation loaders without a direct dependency.
pub use async_trait::async_trait;
