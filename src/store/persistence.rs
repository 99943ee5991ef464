//! Persistence layer: sled-backed entity store

use crate::error::StoreError;
use crate::store::{ChangeBatch, ChangeOp, Store};
use crate::types::EntityKey;
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Separates the kind prefix from the encoded entity key
const KIND_SEPARATOR: u8 = 0;

/// Sled-based implementation of Store
///
/// All kinds share one tree; record keys are `kind \0 entity-key` so a
/// whole batch can be applied in a single sled transaction.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    flush_on_commit: bool,
}

impl SledStore {
    /// Create a new SledStore at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            flush_on_commit: true,
        })
    }

    /// Temporary database removed when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            flush_on_commit: false,
        })
    }

    /// Flush to disk after every applied batch (default: on)
    pub fn with_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Run a sled operation on the blocking pool
    async fn blocking<F, R>(&self, op: &'static str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(sled::Db) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(db))
            .await
            .map_err(|e| StoreError::Backend(format!("{} task failed: {}", op, e)))?
    }
}

fn kind_prefix(kind: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(kind.len() + 1);
    prefix.extend_from_slice(kind.as_bytes());
    prefix.push(KIND_SEPARATOR);
    prefix
}

fn record_key(kind: &str, key: &EntityKey) -> Vec<u8> {
    let mut record = kind_prefix(kind);
    record.extend_from_slice(key.as_slice());
    record
}

fn apply_batch(db: &sled::Db, batch: &ChangeBatch) -> Result<usize, StoreError> {
    let result = db.transaction(|tx| {
        let mut applied = 0usize;
        for change in batch {
            let key = record_key(change.kind, &change.key);
            let exists = tx.get(&key)?.is_some();
            if let Err(e) = change.check(exists) {
                return Err(ConflictableTransactionError::Abort(e));
            }
            match &change.op {
                ChangeOp::Insert(value) | ChangeOp::Update(value) => {
                    tx.insert(key, value.clone())?;
                }
                ChangeOp::Delete => {
                    tx.remove(key)?;
                }
            }
            applied += 1;
        }
        Ok(applied)
    });

    match result {
        Ok(applied) => Ok(applied),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(e.into()),
    }
}

#[async_trait]
impl Store for SledStore {
    async fn scan(&self, kind: &str) -> Result<Vec<(EntityKey, Vec<u8>)>, StoreError> {
        let prefix = kind_prefix(kind);
        self.blocking("scan", move |db| {
            let mut records = Vec::new();
            for item in db.scan_prefix(&prefix) {
                let (key, value) = item?;
                records.push((
                    EntityKey::from_bytes(&key[prefix.len()..]),
                    value.to_vec(),
                ));
            }
            Ok(records)
        })
        .await
    }

    async fn get(&self, kind: &str, key: &EntityKey) -> Result<Option<Vec<u8>>, StoreError> {
        let record = record_key(kind, key);
        self.blocking("get", move |db| Ok(db.get(record)?.map(|v| v.to_vec())))
            .await
    }

    async fn apply(&self, batch: ChangeBatch) -> Result<usize, StoreError> {
        let applied = self
            .blocking("apply", move |db| apply_batch(&db, &batch))
            .await?;

        if self.flush_on_commit {
            // The batch is already durable in the tree at this point
            let bytes = self
                .db
                .flush_async()
                .await
                .map_err(|e| StoreError::Flush(e.to_string()))?;
            debug!(flushed_bytes = bytes, "Flushed sled store");
        }
        Ok(applied)
    }

    async fn kinds(&self) -> Result<Vec<String>, StoreError> {
        self.blocking("kinds", |db| {
            let mut kinds = BTreeSet::new();
            for item in db.iter().keys() {
                let key = item?;
                if let Some(pos) = key.iter().position(|b| *b == KIND_SEPARATOR) {
                    kinds.insert(String::from_utf8_lossy(&key[..pos]).into_owned());
                }
            }
            Ok(kinds.into_iter().collect())
        })
        .await
    }

    fn name(&self) -> &str {
        "sled"
    }
}
