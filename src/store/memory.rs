//! In-process store

use crate::error::StoreError;
use crate::store::{ChangeBatch, ChangeOp, Store};
use crate::types::EntityKey;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

type Collection = BTreeMap<EntityKey, Vec<u8>>;

/// Store holding every collection in memory behind one lock.
///
/// Nothing survives the process; useful for tests and ephemeral contexts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed records of one kind
    pub fn len(&self, kind: &str) -> usize {
        self.collections.read().get(kind).map_or(0, |c| c.len())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn scan(&self, kind: &str) -> Result<Vec<(EntityKey, Vec<u8>)>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(kind)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn get(&self, kind: &str, key: &EntityKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(kind)
            .and_then(|c| c.get(key).cloned()))
    }

    async fn apply(&self, batch: ChangeBatch) -> Result<usize, StoreError> {
        let mut collections = self.collections.write();

        // Check the whole batch first; later changes see earlier ones
        let mut overlay: HashMap<(&str, &EntityKey), bool> = HashMap::new();
        for change in &batch {
            let exists = match overlay.get(&(change.kind, &change.key)) {
                Some(exists) => *exists,
                None => collections
                    .get(change.kind)
                    .is_some_and(|c| c.contains_key(&change.key)),
            };
            change.check(exists)?;
            overlay.insert(
                (change.kind, &change.key),
                !matches!(change.op, ChangeOp::Delete),
            );
        }

        let applied = batch.len();
        for change in batch.into_changes() {
            let collection = collections.entry(change.kind.to_string()).or_default();
            match change.op {
                ChangeOp::Insert(value) | ChangeOp::Update(value) => {
                    collection.insert(change.key, value);
                }
                ChangeOp::Delete => {
                    collection.remove(&change.key);
                }
            }
        }
        Ok(applied)
    }

    async fn kinds(&self) -> Result<Vec<String>, StoreError> {
        let mut kinds: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        kinds.sort();
        Ok(kinds)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
