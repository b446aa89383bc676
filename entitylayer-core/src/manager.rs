//! The provider-facing manager interface.
//!
//! This module defines the core trait that abstracts over concrete store
//! implementations. The query builders and the text query parser dispatch to
//! a [`Manager`]; everything behind it (storage, indexing, execution) is the
//! provider's responsibility.
//!
//! # Overview
//!
//! The [`Manager`] trait exposes a unified async interface for entity
//! insertion, update, deletion, querying and counting. Implementations are
//! required to be thread-safe (`Send + Sync`). The trait is object safe, so
//! `Arc<dyn Manager>` can be handed out by a provider registry.
//!
//! # Error Handling
//!
//! Operations return [`EntityStoreResult<T>`](crate::error::EntityStoreResult).
//! Providers surface their own failures through
//! [`EntityStoreError::Provider`](crate::error::EntityStoreError) and decline
//! optional capabilities with
//! [`EntityStoreError::Unsupported`](crate::error::EntityStoreError); the
//! core never catches or retries either.

use async_trait::async_trait;
use chrono::Duration;
use futures::stream::{BoxStream, StreamExt};

use crate::{
    delete::DeleteQuery,
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
    query::SelectQuery,
};

/// The stream of entities produced by a select.
pub type EntityStream = BoxStream<'static, Entity>;

/// Abstract interface for entity store providers.
///
/// Implementers of this trait provide concrete storage strategies for
/// entities, from in-memory stores to remote column-family or document
/// databases.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access
/// from multiple async tasks. The exact concurrency model is
/// implementation-specific.
#[async_trait]
pub trait Manager: Send + Sync {
    /// Inserts a new entity into its family.
    ///
    /// Returns the stored entity, which the provider may have augmented
    /// (for example with a generated key field).
    async fn insert(&self, entity: Entity) -> EntityStoreResult<Entity>;

    /// Inserts a new entity that expires after the given time-to-live.
    ///
    /// Time-to-live is an optional capability. The default implementation
    /// declines it with [`EntityStoreError::Unsupported`].
    async fn insert_with_ttl(
        &self,
        _entity: Entity,
        _ttl: Duration,
    ) -> EntityStoreResult<Entity> {
        Err(EntityStoreError::Unsupported(
            "insert with time-to-live".to_string(),
        ))
    }

    /// Updates an existing entity, replacing it entirely.
    ///
    /// Returns the stored entity. How the existing record is identified is
    /// provider-specific; providers should document it.
    async fn update(&self, entity: Entity) -> EntityStoreResult<Entity>;

    /// Deletes entities (or, with projections, fields of entities) matching
    /// the query.
    async fn delete(&self, query: DeleteQuery) -> EntityStoreResult<()>;

    /// Streams the entities matching the query.
    async fn select(&self, query: SelectQuery) -> EntityStoreResult<EntityStream>;

    /// Returns at most one entity matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::NonUniqueResult`] when the query matches
    /// more than one entity. Zero matches yield `Ok(None)`.
    async fn single_result(&self, query: SelectQuery) -> EntityStoreResult<Option<Entity>> {
        let family = query.family().to_string();
        let mut stream = self.select(query).await?;

        match stream.next().await {
            None => Ok(None),
            Some(entity) => {
                if stream.next().await.is_some() {
                    return Err(EntityStoreError::NonUniqueResult(family));
                }

                Ok(Some(entity))
            }
        }
    }

    /// Returns the number of entities in a family.
    async fn count(&self, family: &str) -> EntityStoreResult<u64>;

    /// Cleanly releases provider resources.
    ///
    /// The default implementation is a no-op, but providers with external
    /// connections should override this.
    async fn close(&self) -> EntityStoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<M> Manager for &M
where
    M: Manager,
{
    async fn insert(&self, entity: Entity) -> EntityStoreResult<Entity> {
        (*self).insert(entity).await
    }

    async fn insert_with_ttl(
        &self,
        entity: Entity,
        ttl: Duration,
    ) -> EntityStoreResult<Entity> {
        (*self)
            .insert_with_ttl(entity, ttl)
            .await
    }

    async fn update(&self, entity: Entity) -> EntityStoreResult<Entity> {
        (*self).update(entity).await
    }

    async fn delete(&self, query: DeleteQuery) -> EntityStoreResult<()> {
        (*self).delete(query).await
    }

    async fn select(&self, query: SelectQuery) -> EntityStoreResult<EntityStream> {
        (*self).select(query).await
    }

    async fn single_result(&self, query: SelectQuery) -> EntityStoreResult<Option<Entity>> {
        (*self).single_result(query).await
    }

    async fn count(&self, family: &str) -> EntityStoreResult<u64> {
        (*self).count(family).await
    }

    async fn close(&self) -> EntityStoreResult<()> {
        (*self).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    /// A manager that serves a fixed result set for every select.
    #[derive(Debug)]
    struct FixedManager {
        results: Vec<Entity>,
    }

    #[async_trait]
    impl Manager for FixedManager {
        async fn insert(&self, entity: Entity) -> EntityStoreResult<Entity> {
            Ok(entity)
        }

        async fn update(&self, entity: Entity) -> EntityStoreResult<Entity> {
            Ok(entity)
        }

        async fn delete(&self, _query: DeleteQuery) -> EntityStoreResult<()> {
            Ok(())
        }

        async fn select(&self, _query: SelectQuery) -> EntityStoreResult<EntityStream> {
            Ok(stream::iter(self.results.clone()).boxed())
        }

        async fn count(&self, _family: &str) -> EntityStoreResult<u64> {
            Ok(self.results.len() as u64)
        }
    }

    fn god(name: &str) -> Entity {
        let mut entity = Entity::of("God");
        entity.set("name", name);
        entity
    }

    fn query() -> SelectQuery {
        crate::query::select_all().from("God").build()
    }

    #[tokio::test]
    async fn single_result_of_empty_stream_is_none() {
        let manager = FixedManager { results: vec![] };
        assert_eq!(manager.single_result(query()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_result_of_one_is_the_entity() {
        let manager = FixedManager {
            results: vec![god("Diana")],
        };
        assert_eq!(
            manager.single_result(query()).await.unwrap(),
            Some(god("Diana"))
        );
    }

    #[tokio::test]
    async fn single_result_of_two_is_non_unique() {
        let manager = FixedManager {
            results: vec![god("Diana"), god("Artemis")],
        };
        assert!(matches!(
            manager.single_result(query()).await,
            Err(EntityStoreError::NonUniqueResult(family)) if family == "God"
        ));
    }

    #[tokio::test]
    async fn ttl_is_declined_by_default() {
        let manager = FixedManager { results: vec![] };
        assert!(matches!(
            manager
                .insert_with_ttl(god("Diana"), Duration::seconds(10))
                .await,
            Err(EntityStoreError::Unsupported(_))
        ));
    }
}
