//! Database Context
//!
//! The repository layer's view of a store: typed entity collections and a
//! single commit that persists every pending change. All collections handed
//! out by one context share its pending change set, so committing through
//! any of them flushes the changes staged through all of them.

pub mod tracker;

pub use tracker::{ChangeTracker, StageOp};

use crate::cancel::Cancellation;
use crate::config::StoreConfig;
use crate::error::{ConfigError, StoreError};
use crate::query::Query;
use crate::store::{open_store, MemoryStore, Store};
use crate::types::{encode_entity, Entity, EntityKey};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Context interface
#[async_trait]
pub trait DatabaseContext: Send + Sync {
    /// Collection handle for kind `T`; every handle for a kind observes the
    /// same underlying collection and pending change set
    fn collection<T: Entity>(&self) -> EntitySet<T>;

    /// Persist the whole pending change set; returns records affected
    async fn commit(&self, cancel: &Cancellation) -> Result<usize, StoreError>;
}

/// Typed handle onto one entity collection.
///
/// Mutating methods only stage changes; nothing reaches the store until the
/// owning context commits.
pub struct EntitySet<T: Entity> {
    store: Arc<dyn Store>,
    tracker: Arc<Mutex<ChangeTracker>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntitySet<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tracker: Arc::clone(&self.tracker),
            _kind: PhantomData,
        }
    }
}

impl<T: Entity> EntitySet<T> {
    fn new(store: Arc<dyn Store>, tracker: Arc<Mutex<ChangeTracker>>) -> Self {
        Self {
            store,
            tracker,
            _kind: PhantomData,
        }
    }

    pub fn kind(&self) -> &'static str {
        T::KIND
    }

    /// Query over the committed contents of this collection
    pub fn query(&self) -> Query<T> {
        Query::new(Arc::clone(&self.store))
    }

    pub fn add(&self, entity: &T) -> Result<(), StoreError> {
        self.stage(entity, StageOp::Add)
    }

    pub fn add_range(&self, entities: &[T]) -> Result<(), StoreError> {
        let changes = entities
            .iter()
            .map(|e| -> Result<_, StoreError> {
                Ok((T::KIND, EntityKey::of(e)?, StageOp::Add(encode_entity(e)?)))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.stage_batch(changes)
    }

    /// Stage the entity's current field values as its new persisted state
    pub fn update(&self, entity: &T) -> Result<(), StoreError> {
        self.stage(entity, StageOp::Update)
    }

    pub fn remove(&self, entity: &T) -> Result<(), StoreError> {
        let key = EntityKey::of(entity)?;
        debug!(kind = T::KIND, key = %key, "Staging remove");
        self.tracker.lock().stage(T::KIND, key, StageOp::Remove)
    }

    pub fn remove_range(&self, entities: &[T]) -> Result<(), StoreError> {
        let changes = entities
            .iter()
            .map(|e| -> Result<_, StoreError> { Ok((T::KIND, EntityKey::of(e)?, StageOp::Remove)) })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.stage_batch(changes)
    }

    fn stage(&self, entity: &T, op: fn(Vec<u8>) -> StageOp) -> Result<(), StoreError> {
        let key = EntityKey::of(entity)?;
        let value = encode_entity(entity)?;
        debug!(kind = T::KIND, key = %key, "Staging change");
        self.tracker.lock().stage(T::KIND, key, op(value))
    }

    fn stage_batch(&self, changes: Vec<(&'static str, EntityKey, StageOp)>) -> Result<(), StoreError> {
        debug!(kind = T::KIND, count = changes.len(), "Staging batch");
        self.tracker.lock().stage_all(changes)
    }
}

/// Context over any [`Store`], with one shared pending change set.
///
/// Cloning yields another handle onto the same store and pending set.
#[derive(Clone)]
pub struct StoreContext {
    store: Arc<dyn Store>,
    tracker: Arc<Mutex<ChangeTracker>>,
}

impl StoreContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tracker: Arc::new(Mutex::new(ChangeTracker::new())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open the configured store and wrap it in a fresh context
    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(Self::new(open_store(config)?))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Number of staged changes not yet committed
    pub fn pending_changes(&self) -> usize {
        self.tracker.lock().len()
    }

    /// Drop every staged change without committing
    pub fn discard_changes(&self) {
        self.tracker.lock().clear();
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("store", &self.store.name())
            .field("pending", &self.pending_changes())
            .finish()
    }
}

#[async_trait]
impl DatabaseContext for StoreContext {
    fn collection<T: Entity>(&self) -> EntitySet<T> {
        EntitySet::new(Arc::clone(&self.store), Arc::clone(&self.tracker))
    }

    #[instrument(skip_all, fields(store = self.store.name()))]
    async fn commit(&self, cancel: &Cancellation) -> Result<usize, StoreError> {
        cancel.check()?;
        let batch = self.tracker.lock().take();
        if batch.is_empty() {
            debug!("Nothing to commit");
            return Ok(0);
        }

        // The drained batch is never re-staged; a failed apply is not retried
        let staged = batch.len();
        match self.store.apply(batch).await {
            Ok(affected) => {
                info!(staged, affected, "Committed pending changes");
                Ok(affected)
            }
            Err(e) => {
                warn!(staged, error = %e, "Commit failed, pending changes dropped");
                Err(e)
            }
        }
    }
}
