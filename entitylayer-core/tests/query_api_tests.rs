//! End-to-end tests of the public query API against a stub manager.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use entitylayer_core::{
    condition::{Condition, FieldCondition},
    delete::{delete_all, DeleteQuery},
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
    manager::{EntityStream, Manager},
    parser::ManagerQueryExt,
    query::{select, select_all, SelectQuery},
};

/// Serves a fixed result set and records every dispatched query.
#[derive(Debug, Default)]
struct StubManager {
    results: Vec<Entity>,
    selects: Mutex<Vec<SelectQuery>>,
    deletes: Mutex<Vec<DeleteQuery>>,
}

impl StubManager {
    fn serving(results: Vec<Entity>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Manager for StubManager {
    async fn insert(&self, entity: Entity) -> EntityStoreResult<Entity> {
        Ok(entity)
    }

    async fn update(&self, entity: Entity) -> EntityStoreResult<Entity> {
        Ok(entity)
    }

    async fn delete(&self, query: DeleteQuery) -> EntityStoreResult<()> {
        self.deletes.lock().unwrap().push(query);
        Ok(())
    }

    async fn select(&self, query: SelectQuery) -> EntityStoreResult<EntityStream> {
        self.selects.lock().unwrap().push(query);
        Ok(stream::iter(self.results.clone()).boxed())
    }

    async fn count(&self, _family: &str) -> EntityStoreResult<u64> {
        Ok(self.results.len() as u64)
    }
}

fn person(name: &str, age: i32) -> Entity {
    let mut entity = Entity::of("users");
    entity.set("name", name);
    entity.set("age", age);
    entity
}

#[tokio::test]
async fn fluent_execute_streams_entities() {
    let manager = StubManager::serving(vec![person("Ada", 36), person("Grace", 45)]);

    let results: Vec<Entity> = select(["name"])
        .from("users")
        .where_("age")
        .gt(10)
        .execute(&manager)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 2);

    let dispatched = manager.selects.lock().unwrap().last().cloned().unwrap();
    assert_eq!(dispatched.family(), "users");
    assert_eq!(dispatched.projections(), &["name"]);
    assert_eq!(
        dispatched.condition(),
        Some(&FieldCondition::gt("age", 10))
    );
}

#[tokio::test]
async fn fluent_execute_single_applies_cardinality() {
    let manager = StubManager::serving(vec![person("Ada", 36), person("Grace", 45)]);

    let result = select_all()
        .from("users")
        .execute_single(&manager)
        .await;

    assert!(matches!(
        result,
        Err(EntityStoreError::NonUniqueResult(family)) if family == "users"
    ));
}

#[tokio::test]
async fn fluent_delete_dispatches() {
    let manager = StubManager::default();

    delete_all()
        .from("users")
        .where_("name")
        .eq("Ada")
        .execute(&manager)
        .await
        .unwrap();

    let dispatched = manager.deletes.lock().unwrap().last().cloned().unwrap();
    assert_eq!(dispatched.family(), "users");
    assert_eq!(
        dispatched.condition(),
        Some(&FieldCondition::eq("name", "Ada"))
    );
}

#[tokio::test]
async fn textual_and_fluent_selects_agree() {
    let manager = StubManager::default();

    manager
        .query("select name, age from users where age >= 18 order by name asc limit 3")
        .await
        .unwrap();

    let textual = manager.selects.lock().unwrap().last().cloned().unwrap();

    let fluent = select(["name", "age"])
        .from("users")
        .where_("age")
        .gte(18i64)
        .order_by("name")
        .asc()
        .limit(3)
        .build();

    assert_eq!(textual, fluent);
}

#[tokio::test]
async fn prepared_select_round_trip() {
    let manager = StubManager::serving(vec![person("Ada", 36)]);

    let mut statement = manager
        .prepare("select * from users where name = @name")
        .unwrap();
    statement.bind("name", "Ada").unwrap();

    let found = statement.get_single_result().await.unwrap().unwrap();
    assert_eq!(
        found.find_value::<String>("name").unwrap(),
        Some("Ada".to_string())
    );

    let dispatched = manager.selects.lock().unwrap().last().cloned().unwrap();
    let condition = dispatched.condition().unwrap();
    assert_eq!(condition.condition(), Condition::Equals);
    assert_eq!(condition.field().get().unwrap(), bson::Bson::from("Ada"));
}
