//! Entity Store
//!
//! The persistence collaborator behind a context: named collections of
//! serialised entities, one per entity kind, plus an atomic `apply` that
//! persists a batch of staged changes. Query translation and change
//! tracking live above this layer; a store only scans, reads and applies.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::SledStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::types::EntityKey;
use async_trait::async_trait;
use std::sync::Arc;

/// Operation carried by one staged change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// New record; the key must not exist yet
    Insert(Vec<u8>),
    /// Replace an existing record's value
    Update(Vec<u8>),
    /// Remove an existing record
    Delete,
}

/// One record-level change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: &'static str,
    pub key: EntityKey,
    pub op: ChangeOp,
}

impl Change {
    /// Check this change against whether its record currently exists
    pub fn check(&self, exists: bool) -> Result<(), StoreError> {
        match (&self.op, exists) {
            (ChangeOp::Insert(_), true) => Err(StoreError::DuplicateKey {
                kind: self.kind.to_string(),
                key: self.key.to_string(),
            }),
            (ChangeOp::Update(_), false) | (ChangeOp::Delete, false) => {
                Err(StoreError::MissingRecord {
                    kind: self.kind.to_string(),
                    key: self.key.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Changes applied together by one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Store interface
///
/// `apply` is all-or-nothing: every change is checked with [`Change::check`]
/// before anything is written, and the store returns the number of records
/// affected.
#[async_trait]
pub trait Store: Send + Sync {
    /// All committed records of one kind
    async fn scan(&self, kind: &str) -> Result<Vec<(EntityKey, Vec<u8>)>, StoreError>;

    async fn get(&self, kind: &str, key: &EntityKey) -> Result<Option<Vec<u8>>, StoreError>;

    async fn apply(&self, batch: ChangeBatch) -> Result<usize, StoreError>;

    /// Kinds that currently hold at least one record
    async fn kinds(&self) -> Result<Vec<String>, StoreError>;

    /// Short backend name for diagnostics
    fn name(&self) -> &str;
}

/// Open the store described by `config`
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sled => {
            let store = SledStore::new(&config.path)?.with_flush_on_commit(config.flush_on_commit);
            Ok(Arc::new(store))
        }
    }
}
