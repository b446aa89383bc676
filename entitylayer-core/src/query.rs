//! Select query construction.
//!
//! This module provides the immutable [`SelectQuery`] value object together
//! with its two equivalent construction paths: the explicit
//! [`SelectQueryBuilder`] and the fluent chain entered through [`select`] /
//! [`select_all`]. Both feed the same internal state, so equivalent inputs
//! produce equal queries.
//!
//! # Query Building
//!
//! ```ignore
//! use entitylayer_core::query::{select_all, Sort};
//!
//! let query = select_all()
//!     .from("users")
//!     .where_("age")
//!     .gt(10)
//!     .and("name")
//!     .eq("Ada Lovelace")
//!     .order_by("name")
//!     .asc()
//!     .skip(2)
//!     .limit(10)
//!     .build();
//! ```

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::{
    condition::FieldCondition,
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
    manager::{EntityStream, Manager},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Creates an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Creates a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// An immutable query over one family.
///
/// A query carries the target family, an optional condition tree, the
/// projected field names (empty means all fields), the sort keys in
/// precedence order and the skip/limit window. `skip`/`limit` of zero mean
/// "no skip" and "unbounded" respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    family: String,
    condition: Option<FieldCondition>,
    projections: Vec<String>,
    sorts: Vec<Sort>,
    skip: u64,
    limit: u64,
}

impl SelectQuery {
    /// Creates a new explicit builder.
    pub fn builder() -> SelectQueryBuilder {
        SelectQueryBuilder::new()
    }

    /// Returns the family this query targets.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns the condition tree, if any.
    pub fn condition(&self) -> Option<&FieldCondition> {
        self.condition.as_ref()
    }

    /// Returns the projected field names. Empty means all fields.
    pub fn projections(&self) -> &[String] {
        &self.projections
    }

    /// Returns the sort keys in precedence order.
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Returns the number of entities to skip.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Returns the maximum number of entities to return. Zero means
    /// unbounded.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Accumulated state shared by the fluent stages once the family is known.
#[derive(Debug, Clone)]
struct SelectState {
    family: String,
    condition: Option<FieldCondition>,
    projections: Vec<String>,
    sorts: Vec<Sort>,
    skip: u64,
    limit: u64,
}

impl SelectState {
    fn new(family: String, projections: Vec<String>) -> Self {
        Self {
            family,
            condition: None,
            projections,
            sorts: Vec::new(),
            skip: 0,
            limit: 0,
        }
    }

    fn into_query(self) -> SelectQuery {
        SelectQuery {
            family: self.family,
            condition: self.condition,
            projections: self.projections,
            sorts: self.sorts,
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// How a freshly parsed point condition joins the running condition tree.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Connector {
    Base,
    And,
    Or,
}

pub(crate) fn merge_condition(
    existing: Option<FieldCondition>,
    incoming: FieldCondition,
    connector: Connector,
) -> FieldCondition {
    match (connector, existing) {
        (_, None) | (Connector::Base, _) => incoming,
        (Connector::And, Some(current)) => current.and(incoming),
        (Connector::Or, Some(current)) => current.or(incoming),
    }
}

/// Explicit builder for [`SelectQuery`].
///
/// Unlike the fluent path, the explicit builder checks at [`build`] time
/// that a family was supplied.
///
/// Builders are mutable and not thread safe; a single builder must not be
/// shared across concurrent callers.
///
/// [`build`]: SelectQueryBuilder::build
#[derive(Debug, Clone, Default)]
pub struct SelectQueryBuilder {
    family: Option<String>,
    condition: Option<FieldCondition>,
    projections: Vec<String>,
    sorts: Vec<Sort>,
    skip: u64,
    limit: u64,
}

impl SelectQueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends projected field names.
    pub fn projections(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.projections
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the family to query.
    pub fn from(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    /// Sets the condition tree, combining with any previously set condition
    /// under AND.
    pub fn filter(mut self, condition: FieldCondition) -> Self {
        self.condition = Some(match self.condition {
            Some(current) => current.and(condition),
            None => condition,
        });
        self
    }

    /// Appends a sort key. The first appended key has the highest
    /// precedence.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Sets the number of entities to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Builds the query.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidState`] if no family was supplied.
    pub fn build(self) -> EntityStoreResult<SelectQuery> {
        let family = self.family.ok_or_else(|| {
            EntityStoreError::InvalidState(
                "a select query requires a family; call from(...)".to_string(),
            )
        })?;

        Ok(SelectQuery {
            family,
            condition: self.condition,
            projections: self.projections,
            sorts: self.sorts,
            skip: self.skip,
            limit: self.limit,
        })
    }
}

/// Starts a fluent select over the given projected fields.
pub fn select(fields: impl IntoIterator<Item = impl Into<String>>) -> FluentSelect {
    FluentSelect {
        projections: fields
            .into_iter()
            .map(Into::into)
            .collect(),
    }
}

/// Starts a fluent select over all fields.
pub fn select_all() -> FluentSelect {
    FluentSelect {
        projections: Vec::new(),
    }
}

/// Fluent entry stage; only [`from`](FluentSelect::from) is available until
/// the family is named.
#[derive(Debug, Clone)]
pub struct FluentSelect {
    projections: Vec<String>,
}

impl FluentSelect {
    /// Names the family to query.
    pub fn from(self, family: impl Into<String>) -> SelectFrom {
        SelectFrom {
            state: SelectState::new(family.into(), self.projections),
        }
    }
}

/// Fluent stage after the family is known.
#[derive(Debug, Clone)]
pub struct SelectFrom {
    state: SelectState,
}

impl SelectFrom {
    /// Starts a condition on the given field.
    pub fn where_(self, name: impl Into<String>) -> SelectFilter {
        SelectFilter {
            state: self.state,
            name: name.into(),
            negated: false,
            connector: Connector::Base,
        }
    }

    /// Starts a sort key on the given field.
    pub fn order_by(self, name: impl Into<String>) -> SelectOrder {
        SelectOrder {
            state: self.state,
            name: name.into(),
        }
    }

    /// Sets the number of entities to skip.
    pub fn skip(mut self, skip: u64) -> SelectSkip {
        self.state.skip = skip;
        SelectSkip { state: self.state }
    }

    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: u64) -> SelectLimit {
        self.state.limit = limit;
        SelectLimit { state: self.state }
    }

    /// Builds the query.
    pub fn build(self) -> SelectQuery {
        self.state.into_query()
    }

    /// Builds the query and streams the matching entities.
    pub async fn execute<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<EntityStream> {
        manager.select(self.build()).await
    }

    /// Builds the query and returns at most one matching entity.
    pub async fn execute_single<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<Option<Entity>> {
        manager.single_result(self.build()).await
    }
}

/// Fluent stage holding a field name that still awaits its operator.
#[derive(Debug, Clone)]
pub struct SelectFilter {
    state: SelectState,
    name: String,
    negated: bool,
    connector: Connector,
}

impl SelectFilter {
    fn apply(mut self, condition: FieldCondition) -> SelectWhere {
        let condition = if self.negated {
            condition.negate()
        } else {
            condition
        };
        self.state.condition =
            Some(merge_condition(self.state.condition.take(), condition, self.connector));
        SelectWhere { state: self.state }
    }

    /// Negates the condition produced by the next operator call.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Completes the condition with an equality operator.
    pub fn eq(self, value: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::eq(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a pattern-match operator.
    pub fn like(self, pattern: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::like(self.name.clone(), pattern);
        self.apply(condition)
    }

    /// Completes the condition with a greater-than operator.
    pub fn gt(self, value: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::gt(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a greater-than-or-equal operator.
    pub fn gte(self, value: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::gte(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a lesser-than operator.
    pub fn lt(self, value: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::lt(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a lesser-than-or-equal operator.
    pub fn lte(self, value: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::lte(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with an inclusive range operator.
    pub fn between(self, from: impl Into<Bson>, to: impl Into<Bson>) -> SelectWhere {
        let condition = FieldCondition::between(self.name.clone(), from, to);
        self.apply(condition)
    }

    /// Completes the condition with a list-membership operator.
    pub fn in_list(
        self,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> SelectWhere {
        let condition = FieldCondition::in_list(self.name.clone(), values);
        self.apply(condition)
    }
}

/// Fluent stage with a complete condition tree.
#[derive(Debug, Clone)]
pub struct SelectWhere {
    state: SelectState,
}

impl SelectWhere {
    /// Chains another condition under AND.
    pub fn and(self, name: impl Into<String>) -> SelectFilter {
        SelectFilter {
            state: self.state,
            name: name.into(),
            negated: false,
            connector: Connector::And,
        }
    }

    /// Chains another condition under OR.
    pub fn or(self, name: impl Into<String>) -> SelectFilter {
        SelectFilter {
            state: self.state,
            name: name.into(),
            negated: false,
            connector: Connector::Or,
        }
    }

    /// Starts a sort key on the given field.
    pub fn order_by(self, name: impl Into<String>) -> SelectOrder {
        SelectOrder {
            state: self.state,
            name: name.into(),
        }
    }

    /// Sets the number of entities to skip.
    pub fn skip(mut self, skip: u64) -> SelectSkip {
        self.state.skip = skip;
        SelectSkip { state: self.state }
    }

    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: u64) -> SelectLimit {
        self.state.limit = limit;
        SelectLimit { state: self.state }
    }

    /// Builds the query.
    pub fn build(self) -> SelectQuery {
        self.state.into_query()
    }

    /// Builds the query and streams the matching entities.
    pub async fn execute<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<EntityStream> {
        manager.select(self.build()).await
    }

    /// Builds the query and returns at most one matching entity.
    pub async fn execute_single<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<Option<Entity>> {
        manager.single_result(self.build()).await
    }
}

/// Fluent stage holding a sort field that still awaits its direction.
#[derive(Debug, Clone)]
pub struct SelectOrder {
    state: SelectState,
    name: String,
}

impl SelectOrder {
    /// Sorts ascending on the pending field.
    pub fn asc(mut self) -> SelectSorted {
        self.state.sorts.push(Sort::asc(self.name));
        SelectSorted { state: self.state }
    }

    /// Sorts descending on the pending field.
    pub fn desc(mut self) -> SelectSorted {
        self.state.sorts.push(Sort::desc(self.name));
        SelectSorted { state: self.state }
    }
}

/// Fluent stage after at least one complete sort key.
#[derive(Debug, Clone)]
pub struct SelectSorted {
    state: SelectState,
}

impl SelectSorted {
    /// Starts a further sort key; call order is precedence order.
    pub fn order_by(self, name: impl Into<String>) -> SelectOrder {
        SelectOrder {
            state: self.state,
            name: name.into(),
        }
    }

    /// Sets the number of entities to skip.
    pub fn skip(mut self, skip: u64) -> SelectSkip {
        self.state.skip = skip;
        SelectSkip { state: self.state }
    }

    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: u64) -> SelectLimit {
        self.state.limit = limit;
        SelectLimit { state: self.state }
    }

    /// Builds the query.
    pub fn build(self) -> SelectQuery {
        self.state.into_query()
    }

    /// Builds the query and streams the matching entities.
    pub async fn execute<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<EntityStream> {
        manager.select(self.build()).await
    }

    /// Builds the query and returns at most one matching entity.
    pub async fn execute_single<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<Option<Entity>> {
        manager.single_result(self.build()).await
    }
}

/// Fluent stage after the skip was set.
#[derive(Debug, Clone)]
pub struct SelectSkip {
    state: SelectState,
}

impl SelectSkip {
    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: u64) -> SelectLimit {
        self.state.limit = limit;
        SelectLimit { state: self.state }
    }

    /// Builds the query.
    pub fn build(self) -> SelectQuery {
        self.state.into_query()
    }

    /// Builds the query and streams the matching entities.
    pub async fn execute<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<EntityStream> {
        manager.select(self.build()).await
    }

    /// Builds the query and returns at most one matching entity.
    pub async fn execute_single<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<Option<Entity>> {
        manager.single_result(self.build()).await
    }
}

/// Terminal fluent stage after the limit was set.
#[derive(Debug, Clone)]
pub struct SelectLimit {
    state: SelectState,
}

impl SelectLimit {
    /// Builds the query.
    pub fn build(self) -> SelectQuery {
        self.state.into_query()
    }

    /// Builds the query and streams the matching entities.
    pub async fn execute<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<EntityStream> {
        manager.select(self.build()).await
    }

    /// Builds the query and returns at most one matching entity.
    pub async fn execute_single<M: Manager + ?Sized>(
        self,
        manager: &M,
    ) -> EntityStoreResult<Option<Entity>> {
        manager.single_result(self.build()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded() {
        let query = select_all().from("God").build();

        assert_eq!(query.family(), "God");
        assert!(query.projections().is_empty());
        assert!(query.sorts().is_empty());
        assert!(query.condition().is_none());
        assert_eq!(query.skip(), 0);
        assert_eq!(query.limit(), 0);
    }

    #[test]
    fn fluent_and_builder_paths_are_equivalent() {
        let fluent = select(["name", "age"])
            .from("users")
            .where_("age")
            .gt(10)
            .and("name")
            .eq("Ada Lovelace")
            .order_by("name")
            .asc()
            .skip(2)
            .limit(5)
            .build();

        let built = SelectQuery::builder()
            .projections(["name", "age"])
            .from("users")
            .filter(
                FieldCondition::gt("age", 10)
                    .and(FieldCondition::eq("name", "Ada Lovelace")),
            )
            .sort(Sort::asc("name"))
            .skip(2)
            .limit(5)
            .build()
            .unwrap();

        assert_eq!(fluent, built);
    }

    #[test]
    fn build_without_from_is_rejected() {
        let result = SelectQuery::builder()
            .projections(["name"])
            .build();

        assert!(matches!(result, Err(EntityStoreError::InvalidState(_))));
    }

    #[test]
    fn sort_keys_append_in_call_order() {
        let query = select_all()
            .from("users")
            .order_by("name")
            .asc()
            .order_by("age")
            .desc()
            .build();

        assert_eq!(
            query.sorts(),
            &[Sort::asc("name"), Sort::desc("age")]
        );
    }

    #[test]
    fn mixed_chains_combine_left_to_right() {
        let query = select_all()
            .from("users")
            .where_("age")
            .gt(10)
            .or("age")
            .lt(5)
            .and("name")
            .eq("Ada Lovelace")
            .build();

        // ((age > 10 OR age < 5) AND name = Ada Lovelace)
        let expected = FieldCondition::gt("age", 10)
            .or(FieldCondition::lt("age", 5))
            .and(FieldCondition::eq("name", "Ada Lovelace"));

        assert_eq!(query.condition(), Some(&expected));
    }

    #[test]
    fn not_negates_the_next_operator() {
        let query = select_all()
            .from("users")
            .where_("name")
            .not()
            .eq("Ada Lovelace")
            .build();

        assert_eq!(
            query.condition(),
            Some(&FieldCondition::eq("name", "Ada Lovelace").negate())
        );
    }

    #[test]
    fn between_and_in_operators() {
        let query = select_all()
            .from("users")
            .where_("age")
            .between(10, 20)
            .or("name")
            .in_list(["Ada", "Grace"])
            .build();

        let expected = FieldCondition::between("age", 10, 20)
            .or(FieldCondition::in_list("name", ["Ada", "Grace"]));
        assert_eq!(query.condition(), Some(&expected));
    }

    #[test]
    fn repeated_filter_calls_combine_under_and() {
        let query = SelectQuery::builder()
            .from("users")
            .filter(FieldCondition::gt("age", 10))
            .filter(FieldCondition::eq("name", "Ada Lovelace"))
            .build()
            .unwrap();

        let expected = FieldCondition::gt("age", 10)
            .and(FieldCondition::eq("name", "Ada Lovelace"));
        assert_eq!(query.condition(), Some(&expected));
    }
}
