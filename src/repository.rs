//! Generic Repository
//!
//! Strongly typed CRUD over one entity collection. Reads compose an optional
//! include directive with an optional predicate; every mutation stages its
//! change and then commits the context.
//!
//! Commit flushes the context's whole pending change set, so a mutation made
//! through one repository also persists whatever other repositories (or
//! collections) sharing the same context have staged. This is implicit
//! coupling between repositories on one context, not per-call isolation;
//! callers that need isolation use separate contexts.

use crate::cancel::Cancellation;
use crate::context::{DatabaseContext, EntitySet};
use crate::error::{NotFoundError, RepositoryError};
use crate::include::Include;
use crate::query::{Predicate, Query};
use crate::types::Entity;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Repository interface
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Composable query over the full collection
    fn queryable(&self) -> Query<T>;

    /// Every entity, with the optional include directive applied
    async fn get_all(&self, include: Option<&Include>) -> Result<Vec<T>, RepositoryError>;

    /// Entities matching `predicate`; includes are loaded before filtering
    async fn get_all_where(
        &self,
        predicate: Predicate<T>,
        include: Option<&Include>,
    ) -> Result<Vec<T>, RepositoryError>;

    /// First entity matching `predicate`, or `None`
    async fn get(
        &self,
        predicate: Predicate<T>,
        include: Option<&Include>,
    ) -> Result<Option<T>, RepositoryError>;

    async fn add(&self, entity: &T) -> Result<(), RepositoryError>;

    /// Stage every entity, then commit once
    async fn add_range(&self, entities: &[T]) -> Result<(), RepositoryError>;

    /// Persist the entity's current field values
    async fn update(&self, entity: &T) -> Result<(), RepositoryError>;

    async fn remove(&self, entity: &T) -> Result<(), RepositoryError>;

    /// Remove the first entity matching `predicate`.
    ///
    /// Fails with `RepositoryError::NotFound` and changes nothing when no
    /// entity matches.
    async fn remove_by_predicate(&self, predicate: Predicate<T>) -> Result<(), RepositoryError>;

    /// Stage every removal, then commit once
    async fn remove_range(&self, entities: &[T]) -> Result<(), RepositoryError>;
}

/// Repository over any [`DatabaseContext`].
///
/// Holds only the context and its collection handle; it never caches
/// entities or query results between calls.
pub struct EntityRepository<T: Entity, C: DatabaseContext> {
    context: Arc<C>,
    entities: EntitySet<T>,
    cancel: Cancellation,
}

impl<T: Entity, C: DatabaseContext> Clone for EntityRepository<T, C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            entities: self.entities.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Entity, C: DatabaseContext> EntityRepository<T, C> {
    pub fn new(context: Arc<C>) -> Self {
        let entities = context.collection::<T>();
        Self {
            context,
            entities,
            cancel: Cancellation::default(),
        }
    }

    /// Use `cancel` for every query and commit this repository issues
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    fn compose(&self, include: Option<&Include>) -> Query<T> {
        let query = self.entities.query();
        match include {
            Some(include) => query.include(include),
            None => query,
        }
    }

    async fn commit(&self) -> Result<usize, RepositoryError> {
        Ok(self.context.commit(&self.cancel).await?)
    }
}

#[async_trait]
impl<T: Entity, C: DatabaseContext> Repository<T> for EntityRepository<T, C> {
    fn queryable(&self) -> Query<T> {
        self.entities.query()
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn get_all(&self, include: Option<&Include>) -> Result<Vec<T>, RepositoryError> {
        let rows = self.compose(include).to_vec(&self.cancel).await?;
        debug!(rows = rows.len(), "Loaded all entities");
        Ok(rows)
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn get_all_where(
        &self,
        predicate: Predicate<T>,
        include: Option<&Include>,
    ) -> Result<Vec<T>, RepositoryError> {
        let rows = self
            .compose(include)
            .filter(predicate)
            .to_vec(&self.cancel)
            .await?;
        debug!(rows = rows.len(), "Loaded matching entities");
        Ok(rows)
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn get(
        &self,
        predicate: Predicate<T>,
        include: Option<&Include>,
    ) -> Result<Option<T>, RepositoryError> {
        Ok(self
            .compose(include)
            .filter(predicate)
            .first(&self.cancel)
            .await?)
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn add(&self, entity: &T) -> Result<(), RepositoryError> {
        self.cancel.check()?;
        self.entities.add(entity)?;
        self.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = T::KIND, count = entities.len()))]
    async fn add_range(&self, entities: &[T]) -> Result<(), RepositoryError> {
        self.cancel.check()?;
        self.entities.add_range(entities)?;
        self.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn update(&self, entity: &T) -> Result<(), RepositoryError> {
        self.cancel.check()?;
        self.entities.update(entity)?;
        self.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn remove(&self, entity: &T) -> Result<(), RepositoryError> {
        self.cancel.check()?;
        self.entities.remove(entity)?;
        self.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = T::KIND))]
    async fn remove_by_predicate(&self, predicate: Predicate<T>) -> Result<(), RepositoryError> {
        let entity = self
            .entities
            .query()
            .filter(predicate)
            .first(&self.cancel)
            .await?
            .ok_or_else(|| NotFoundError {
                kind: T::KIND.to_string(),
            })?;

        self.entities.remove(&entity)?;
        self.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = T::KIND, count = entities.len()))]
    async fn remove_range(&self, entities: &[T]) -> Result<(), RepositoryError> {
        self.cancel.check()?;
        self.entities.remove_range(entities)?;
        self.commit().await?;
        Ok(())
    }
}
