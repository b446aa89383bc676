//! In-memory entity store implementation.
//!
//! This module provides a simple in-memory provider that stores entities in
//! HashMaps behind async-safe read-write locks. It is intended for
//! development, testing and as the reference behavior for other providers.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::Uuid;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use mea::rwlock::RwLock;

use entitylayer_core::{
    delete::DeleteQuery,
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
    manager::{EntityStream, Manager},
    provider::{ManagerFactory, Settings},
    query::{SelectQuery, SortDirection},
};

use crate::evaluator::{Comparable, ConditionEvaluator};

/// The field the store keys entities by. Assigned on insert, required on
/// update.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone)]
struct StoredEntity {
    entity: Entity,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntity {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

type FamilyMap = HashMap<String, StoredEntity>;
type StoreMap = HashMap<String, FamilyMap>;

/// Thread-safe in-memory entity store.
///
/// Inserts assign each entity a generated key in its [`ID_FIELD`] field and
/// return the augmented entity; updates locate the record by that field.
/// Entities inserted with a time-to-live become invisible once expired.
///
/// # Thread Safety
///
/// `InMemoryManager` is cloneable and uses an `Arc`-wrapped internal state,
/// allowing it to be safely shared across async tasks. Multiple clones of
/// the same instance share the same underlying data.
///
/// # Performance
///
/// Queries scan all entities of a family (no indexing). For small to medium
/// datasets this is typically acceptable.
///
/// # Example
///
/// ```ignore
/// use entitylayer_memory::InMemoryManager;
/// use entitylayer_core::{entity::Entity, manager::Manager, query::select_all};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = InMemoryManager::new();
///
///     let mut user = Entity::of("users");
///     user.set("name", "Alice");
///     manager.insert(user).await?;
///
///     let query = select_all().from("users").build();
///     let found = manager.select(query).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryManager {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryManager {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryManager`.
    pub fn builder() -> InMemoryManagerBuilder {
        InMemoryManagerBuilder::default()
    }

    async fn store_entity(
        &self,
        entity: Entity,
        expires_at: Option<DateTime<Utc>>,
    ) -> EntityStoreResult<Entity> {
        let mut entity = entity.resolved()?;
        let key = Uuid::new().to_string();
        entity.set(ID_FIELD, key.clone());

        let mut store = self.store.write().await;
        store
            .entry(entity.name().to_string())
            .or_default()
            .insert(
                key,
                StoredEntity {
                    entity: entity.clone(),
                    expires_at,
                },
            );

        Ok(entity)
    }

    /// Returns the live entities of a family, filtered by the condition.
    fn live_matches(
        family_map: &FamilyMap,
        condition: Option<&entitylayer_core::condition::FieldCondition>,
        now: DateTime<Utc>,
    ) -> EntityStoreResult<Vec<Entity>> {
        let live = family_map
            .values()
            .filter(|stored| stored.is_live(now))
            .map(|stored| &stored.entity);

        match condition {
            Some(condition) => ConditionEvaluator::filter_entities(live, condition),
            None => Ok(live.cloned().collect()),
        }
    }
}

#[async_trait]
impl Manager for InMemoryManager {
    async fn insert(&self, entity: Entity) -> EntityStoreResult<Entity> {
        self.store_entity(entity, None).await
    }

    async fn insert_with_ttl(
        &self,
        entity: Entity,
        ttl: Duration,
    ) -> EntityStoreResult<Entity> {
        self.store_entity(entity, Some(Utc::now() + ttl))
            .await
    }

    async fn update(&self, entity: Entity) -> EntityStoreResult<Entity> {
        let entity = entity.resolved()?;
        let key = entity
            .find_value::<String>(ID_FIELD)?
            .ok_or_else(|| {
                EntityStoreError::InvalidArgument(format!(
                    "an update requires the {ID_FIELD} field assigned on insert"
                ))
            })?;

        let mut store = self.store.write().await;
        let stored = store
            .get_mut(entity.name())
            .and_then(|family_map| family_map.get_mut(&key))
            .ok_or_else(|| {
                EntityStoreError::EntityNotFound(key.clone(), entity.name().to_string())
            })?;

        stored.entity = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, query: DeleteQuery) -> EntityStoreResult<()> {
        let now = Utc::now();
        let mut store = self.store.write().await;
        let family_map = match store.get_mut(query.family()) {
            Some(family_map) => family_map,
            None => return Ok(()),
        };

        let matches = Self::live_matches(family_map, query.condition(), now)?;

        for entity in matches {
            let Some(key) = entity.find_value::<String>(ID_FIELD)? else {
                continue;
            };

            if query.projections().is_empty() {
                family_map.remove(&key);
            } else if let Some(stored) = family_map.get_mut(&key) {
                for field in query.projections() {
                    stored.entity.remove(field);
                }
            }
        }

        Ok(())
    }

    async fn select(&self, query: SelectQuery) -> EntityStoreResult<EntityStream> {
        let now = Utc::now();
        let store = self.store.read().await;
        let family_map = match store.get(query.family()) {
            Some(family_map) => family_map,
            None => return Ok(stream::iter(Vec::new()).boxed()),
        };

        let mut matches = Self::live_matches(family_map, query.condition(), now)?;

        if !query.sorts().is_empty() {
            matches.sort_by(|a, b| {
                query
                    .sorts()
                    .iter()
                    .map(|sort| {
                        let left = a
                            .find(&sort.field)
                            .and_then(|field| field.get().ok());
                        let right = b
                            .find(&sort.field)
                            .and_then(|field| field.get().ok());

                        let left = left
                            .as_ref()
                            .map(Comparable::from)
                            .unwrap_or(Comparable::Null);
                        let right = right
                            .as_ref()
                            .map(Comparable::from)
                            .unwrap_or(Comparable::Null);

                        let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
                        match sort.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = query.skip() as usize;
        let limit = if query.limit() == 0 {
            usize::MAX
        } else {
            query.limit() as usize
        };

        let mut window: Vec<Entity> = matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect();

        if !query.projections().is_empty() {
            window = window
                .into_iter()
                .map(|entity| {
                    let name = entity.name().to_string();
                    let fields = entity
                        .into_fields()
                        .into_iter()
                        .filter(|field| {
                            query
                                .projections()
                                .iter()
                                .any(|projected| projected == field.name())
                        });
                    Entity::of_fields(name, fields)
                })
                .collect();
        }

        Ok(stream::iter(window).boxed())
    }

    async fn count(&self, family: &str) -> EntityStoreResult<u64> {
        let now = Utc::now();
        let store = self.store.read().await;

        Ok(store
            .get(family)
            .map(|family_map| {
                family_map
                    .values()
                    .filter(|stored| stored.is_live(now))
                    .count() as u64
            })
            .unwrap_or(0))
    }
}

/// Builder for constructing [`InMemoryManager`] instances.
///
/// The in-memory provider needs no configuration; the builder exists so the
/// provider can be registered as a [`ManagerFactory`] next to configured
/// backends.
#[derive(Default, Debug, Clone, Copy)]
pub struct InMemoryManagerBuilder;

#[async_trait]
impl ManagerFactory for InMemoryManagerBuilder {
    type Manager = InMemoryManager;

    async fn create(&self, _settings: &Settings) -> EntityStoreResult<Self::Manager> {
        Ok(InMemoryManager::new())
    }
}
