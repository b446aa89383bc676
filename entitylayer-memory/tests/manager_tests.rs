//! Behavior tests for the in-memory provider, exercised through the core
//! manager, builder and parser interfaces.

use std::sync::Arc;

use chrono::Duration;
use futures::stream::StreamExt;

use entitylayer_core::{
    condition::FieldCondition,
    delete::{delete, delete_all},
    entity::Entity,
    error::EntityStoreError,
    manager::Manager,
    parser::ManagerQueryExt,
    provider::{ManagerFactory, ProviderRegistry, Settings},
    query::{select, select_all},
};
use entitylayer_memory::{InMemoryManager, InMemoryManagerBuilder, ID_FIELD};

fn god(name: &str, age: i32) -> Entity {
    let mut entity = Entity::of("God");
    entity.set("name", name);
    entity.set("age", age);
    entity
}

async fn seeded() -> InMemoryManager {
    let manager = InMemoryManager::new();
    for entity in [god("Diana", 10), god("Artemis", 30), god("Apollo", 20)] {
        manager.insert(entity).await.unwrap();
    }
    manager
}

#[tokio::test]
async fn insert_assigns_a_key() {
    let manager = InMemoryManager::new();

    let stored = manager.insert(god("Diana", 10)).await.unwrap();

    assert!(stored.contains(ID_FIELD));
    assert_eq!(manager.count("God").await.unwrap(), 1);
}

#[tokio::test]
async fn select_filters_by_condition() {
    let manager = seeded().await;

    let found: Vec<Entity> = select_all()
        .from("God")
        .where_("age")
        .gt(15)
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(found.len(), 2);
    assert!(found
        .iter()
        .all(|entity| entity.find_value::<i32>("age").unwrap().unwrap() > 15));
}

#[tokio::test]
async fn select_sorts_skips_and_limits() {
    let manager = seeded().await;

    let found: Vec<Entity> = select_all()
        .from("God")
        .order_by("age")
        .asc()
        .skip(1)
        .limit(1)
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].find_value::<String>("name").unwrap(),
        Some("Apollo".to_string())
    );
}

#[tokio::test]
async fn select_projects_named_fields() {
    let manager = seeded().await;

    let found: Vec<Entity> = select(["name"])
        .from("God")
        .where_("name")
        .eq("Diana")
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].names(), vec!["name"]);
}

#[tokio::test]
async fn update_replaces_by_key() {
    let manager = InMemoryManager::new();
    let mut stored = manager.insert(god("Diana", 10)).await.unwrap();

    stored.set("age", 11);
    manager.update(stored).await.unwrap();

    let found = manager
        .single_result(select_all().from("God").build())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.find_value::<i32>("age").unwrap(), Some(11));
}

#[tokio::test]
async fn update_without_key_is_rejected() {
    let manager = InMemoryManager::new();

    assert!(matches!(
        manager.update(god("Diana", 10)).await,
        Err(EntityStoreError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn update_of_unknown_key_is_rejected() {
    let manager = InMemoryManager::new();

    let mut entity = god("Diana", 10);
    entity.set(ID_FIELD, "missing");

    assert!(matches!(
        manager.update(entity).await,
        Err(EntityStoreError::EntityNotFound(_, _))
    ));
}

#[tokio::test]
async fn delete_removes_matching_entities() {
    let manager = seeded().await;

    delete_all()
        .from("God")
        .where_("age")
        .gt(15)
        .execute(&manager)
        .await
        .unwrap();

    assert_eq!(manager.count("God").await.unwrap(), 1);
}

#[tokio::test]
async fn delete_with_projections_strips_fields() {
    let manager = seeded().await;

    delete(["age"])
        .from("God")
        .where_("name")
        .eq("Diana")
        .execute(&manager)
        .await
        .unwrap();

    assert_eq!(manager.count("God").await.unwrap(), 3);

    let diana = manager
        .single_result(
            select_all()
                .from("God")
                .where_("name")
                .eq("Diana")
                .build(),
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!diana.contains("age"));
    assert!(diana.contains("name"));
}

#[tokio::test]
async fn expired_entities_are_invisible() {
    let manager = InMemoryManager::new();

    manager
        .insert_with_ttl(god("Diana", 10), Duration::milliseconds(-1))
        .await
        .unwrap();
    manager
        .insert_with_ttl(god("Artemis", 30), Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(manager.count("God").await.unwrap(), 1);

    let found: Vec<Entity> = select_all()
        .from("God")
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(
        found[0].find_value::<String>("name").unwrap(),
        Some("Artemis".to_string())
    );
}

#[tokio::test]
async fn selecting_an_unknown_family_is_empty() {
    let manager = InMemoryManager::new();

    let found: Vec<Entity> = select_all()
        .from("nowhere")
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;
    assert!(found.is_empty());
    assert_eq!(manager.count("nowhere").await.unwrap(), 0);
}

#[tokio::test]
async fn textual_queries_run_end_to_end() {
    let manager = seeded().await;

    let found = manager
        .query("select * from God where age >= 20 order by age desc")
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(
        found[0].find_value::<String>("name").unwrap(),
        Some("Artemis".to_string())
    );

    manager
        .query("insert God (name = \"Minerva\", age = 25)")
        .await
        .unwrap();
    assert_eq!(manager.count("God").await.unwrap(), 4);
}

#[tokio::test]
async fn prepared_statements_run_end_to_end() {
    let manager = seeded().await;

    let mut statement = manager
        .prepare("delete from God where age = @age")
        .unwrap();
    statement.bind("age", 10).unwrap();
    statement.get_result().await.unwrap();

    assert_eq!(manager.count("God").await.unwrap(), 2);

    let mut lookup = manager
        .prepare("select * from God where name = @name")
        .unwrap();
    lookup.bind("name", "Apollo").unwrap();

    let apollo = lookup.get_single_result().await.unwrap().unwrap();
    assert_eq!(apollo.find_value::<i32>("age").unwrap(), Some(20));
}

#[tokio::test]
async fn factory_resolves_through_the_registry() {
    let mut registry: ProviderRegistry<InMemoryManagerBuilder> = ProviderRegistry::new();
    registry
        .register("memory", Arc::new(InMemoryManagerBuilder))
        .unwrap();

    let factory = registry.resolve().unwrap();
    let manager = factory.create(&Settings::new()).await.unwrap();

    manager.insert(god("Diana", 10)).await.unwrap();
    assert_eq!(manager.count("God").await.unwrap(), 1);
}

#[tokio::test]
async fn explicit_filter_matches_fluent_chain() {
    let manager = seeded().await;

    let query = select_all()
        .from("God")
        .where_("age")
        .between(15, 30)
        .and("name")
        .not()
        .eq("Nobody")
        .build();

    let explicit = entitylayer_core::query::SelectQuery::builder()
        .from("God")
        .filter(
            FieldCondition::between("age", 15, 30)
                .and(FieldCondition::eq("name", "Nobody").negate()),
        )
        .build()
        .unwrap();
    assert_eq!(query, explicit);

    let found: Vec<Entity> = manager.select(query).await.unwrap().collect().await;
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn negated_conditions_filter() {
    let manager = seeded().await;

    let found: Vec<Entity> = select_all()
        .from("God")
        .where_("name")
        .not()
        .eq("Diana")
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(found.len(), 2);
}
