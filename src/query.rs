//! Query Composition
//!
//! A [`Query`] is a lazily evaluated description of a read: an include
//! directive, any number of predicates and an optional limit. Nothing touches
//! the store until one of the executing methods (`to_vec`, `first`, `count`,
//! `any`) is awaited.
//!
//! Execution order per row is decode, materialise includes, then filter, so
//! predicates may read navigation data the directive loaded.

use crate::cancel::Cancellation;
use crate::error::StoreError;
use crate::include::{Include, NavigationPath};
use crate::store::Store;
use crate::types::{decode_entity, Entity, EntityKey};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Side-effect-free boolean filter over one entity
pub struct Predicate<T> {
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: 'static> Predicate<T> {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
        }
    }

    /// Matches every entity
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, entity: &T) -> bool {
        (self.test)(entity)
    }

    pub fn and(self, other: Predicate<T>) -> Self {
        Self::new(move |e| self.matches(e) && other.matches(e))
    }

    pub fn or(self, other: Predicate<T>) -> Self {
        Self::new(move |e| self.matches(e) || other.matches(e))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(move |e| !self.matches(e))
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

/// Composable, lazily evaluated query over one entity collection
pub struct Query<T: Entity> {
    store: Arc<dyn Store>,
    include: Include,
    predicates: Vec<Predicate<T>>,
    limit: Option<usize>,
}

impl<T: Entity> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            include: self.include.clone(),
            predicates: self.predicates.clone(),
            limit: self.limit,
        }
    }
}

impl<T: Entity> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("kind", &T::KIND)
            .field("include", &self.include)
            .field("predicates", &self.predicates.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            include: Include::new(),
            predicates: Vec::new(),
            limit: None,
        }
    }

    /// Merge an include directive into this query
    pub fn include(mut self, include: &Include) -> Self {
        self.include = self.include.merge(include);
        self
    }

    /// Add a predicate; every predicate must hold for a row to be returned
    pub fn filter(mut self, predicate: Predicate<T>) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Return at most `n` rows
    pub fn take(mut self, n: usize) -> Self {
        self.limit = Some(self.limit.map_or(n, |l| l.min(n)));
        self
    }

    pub fn include_directive(&self) -> &Include {
        &self.include
    }

    /// Execute and materialise every matching row
    pub async fn to_vec(self, cancel: &Cancellation) -> Result<Vec<T>, StoreError> {
        cancel.check()?;
        self.validate_include()?;

        if self.limit == Some(0) {
            return Ok(Vec::new());
        }

        let rows = self.store.scan(T::KIND).await?;
        let related = Related::new(self.store.as_ref(), cancel);
        let mut out = Vec::new();

        for (_, raw) in rows {
            cancel.check()?;
            let mut entity: T = decode_entity(&raw)?;
            for path in self.include.paths() {
                entity.load_navigation(path, &related).await?;
            }
            if self.predicates.iter().all(|p| p.matches(&entity)) {
                out.push(entity);
                if self.limit.is_some_and(|limit| out.len() >= limit) {
                    break;
                }
            }
        }

        trace!(kind = T::KIND, rows = out.len(), "Query materialised");
        Ok(out)
    }

    /// First matching row, if any
    pub async fn first(self, cancel: &Cancellation) -> Result<Option<T>, StoreError> {
        Ok(self.take(1).to_vec(cancel).await?.into_iter().next())
    }

    pub async fn count(self, cancel: &Cancellation) -> Result<usize, StoreError> {
        Ok(self.to_vec(cancel).await?.len())
    }

    pub async fn any(self, cancel: &Cancellation) -> Result<bool, StoreError> {
        Ok(self.first(cancel).await?.is_some())
    }

    fn validate_include(&self) -> Result<(), StoreError> {
        for path in self.include.paths() {
            check_navigation::<T>(path)?;
        }
        Ok(())
    }
}

fn check_navigation<T: Entity>(path: &NavigationPath) -> Result<(), StoreError> {
    if T::NAVIGATIONS.iter().any(|n| *n == path.head()) {
        Ok(())
    } else {
        Err(StoreError::UnknownNavigation {
            kind: T::KIND.to_string(),
            navigation: path.head().to_string(),
        })
    }
}

/// Read access to other collections while materialising navigations
pub struct Related<'a> {
    store: &'a dyn Store,
    cancel: &'a Cancellation,
}

impl<'a> Related<'a> {
    pub(crate) fn new(store: &'a dyn Store, cancel: &'a Cancellation) -> Self {
        Self { store, cancel }
    }

    /// Load one related entity by its key
    pub async fn by_key<U: Entity>(&self, key: &U::Key) -> Result<Option<U>, StoreError> {
        self.cancel.check()?;
        let key = EntityKey::encode(key)?;
        match self.store.get(U::KIND, &key).await? {
            Some(raw) => Ok(Some(decode_entity(&raw)?)),
            None => Ok(None),
        }
    }

    /// All related entities of kind `U` matching `predicate`
    pub async fn filter<U, F>(&self, predicate: F) -> Result<Vec<U>, StoreError>
    where
        U: Entity,
        F: Fn(&U) -> bool + Send + Sync,
    {
        self.cancel.check()?;
        let mut out = Vec::new();
        for (_, raw) in self.store.scan(U::KIND).await? {
            let entity: U = decode_entity(&raw)?;
            if predicate(&entity) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// First related entity of kind `U` matching `predicate`
    pub async fn find<U, F>(&self, predicate: F) -> Result<Option<U>, StoreError>
    where
        U: Entity,
        F: Fn(&U) -> bool + Send + Sync,
    {
        self.cancel.check()?;
        for (_, raw) in self.store.scan(U::KIND).await? {
            let entity: U = decode_entity(&raw)?;
            if predicate(&entity) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    /// Load `path` on a related entity, checking it against `U`'s navigations
    pub async fn include<U: Entity>(
        &self,
        entity: &mut U,
        path: &NavigationPath,
    ) -> Result<(), StoreError> {
        check_navigation::<U>(path)?;
        entity.load_navigation(path, self).await
    }

    /// Load the tail of `path`, if any, on a related entity
    pub async fn include_rest<U: Entity>(
        &self,
        entity: &mut U,
        path: &NavigationPath,
    ) -> Result<(), StoreError> {
        match path.rest() {
            Some(rest) => self.include(entity, &rest).await,
            None => Ok(()),
        }
    }
}
