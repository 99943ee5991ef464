//! Core types: the entity capability trait and store identity keys.

use crate::error::StoreError;
use crate::include::NavigationPath;
use crate::query::Related;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Capability set a record type needs to be stored and queried.
///
/// `KIND` names the entity collection, `key()` gives store identity, and
/// `NAVIGATIONS` lists the related paths `load_navigation` can materialise.
/// Fields filled by navigation loading are usually `#[serde(skip)]` so they
/// are not persisted with the owning record.
#[async_trait]
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Key: Serialize + Send + Sync;

    const KIND: &'static str;

    const NAVIGATIONS: &'static [&'static str] = &[];

    fn key(&self) -> Self::Key;

    /// Materialise the navigation whose first segment is `path.head()`.
    ///
    /// Nested segments are handed on with `related.include(&mut child, &rest)`.
    async fn load_navigation(
        &mut self,
        path: &NavigationPath,
        _related: &Related<'_>,
    ) -> Result<(), StoreError> {
        Err(StoreError::UnknownNavigation {
            kind: Self::KIND.to_string(),
            navigation: path.to_string(),
        })
    }
}

/// Encoded store identity of one entity within its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(Vec<u8>);

impl EntityKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn encode<K: Serialize + ?Sized>(key: &K) -> Result<Self, StoreError> {
        Ok(Self(bincode::serialize(key)?))
    }

    pub fn of<T: Entity>(entity: &T) -> Result<Self, StoreError> {
        Self::encode(&entity.key())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Serialise an entity's current field values
pub(crate) fn encode_entity<T: Entity>(entity: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(entity)?)
}

pub(crate) fn decode_entity<T: Entity>(raw: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(raw)?)
}
