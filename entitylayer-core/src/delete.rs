//! Delete query construction.
//!
//! A [`DeleteQuery`] removes whole entities from a family, or only the named
//! fields of the matching entities when projections are given. Like select
//! queries it has an explicit builder and an equivalent fluent chain entered
//! through [`delete`] / [`delete_all`]; unlike select queries there is no
//! sorting and no skip/limit window.

use bson::Bson;

use crate::{
    condition::FieldCondition,
    error::{EntityStoreError, EntityStoreResult},
    manager::Manager,
    query::{merge_condition, Connector},
};

/// An immutable delete query over one family.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    family: String,
    condition: Option<FieldCondition>,
    projections: Vec<String>,
}

impl DeleteQuery {
    /// Creates a new explicit builder.
    pub fn builder() -> DeleteQueryBuilder {
        DeleteQueryBuilder::new()
    }

    /// Returns the family this query targets.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns the condition tree, if any.
    pub fn condition(&self) -> Option<&FieldCondition> {
        self.condition.as_ref()
    }

    /// Returns the field names to remove. Empty means the whole entity.
    pub fn projections(&self) -> &[String] {
        &self.projections
    }
}

/// Explicit builder for [`DeleteQuery`].
///
/// Builders are mutable and not thread safe; a single builder must not be
/// shared across concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct DeleteQueryBuilder {
    family: Option<String>,
    condition: Option<FieldCondition>,
    projections: Vec<String>,
}

impl DeleteQueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the field names to remove from matching entities.
    pub fn projections(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.projections
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the family to delete from.
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

    /// Builds the query.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidState`] if no family was supplied.
    pub fn build(self) -> EntityStoreResult<DeleteQuery> {
        let family = self.family.ok_or_else(|| {
            EntityStoreError::InvalidState(
                "a delete query requires a family; call from(...)".to_string(),
            )
        })?;

        Ok(DeleteQuery {
            family,
            condition: self.condition,
            projections: self.projections,
        })
    }
}

/// Starts a fluent delete of the given fields from matching entities.
pub fn delete(fields: impl IntoIterator<Item = impl Into<String>>) -> FluentDelete {
    FluentDelete {
        projections: fields
            .into_iter()
            .map(Into::into)
            .collect(),
    }
}

/// Starts a fluent delete of whole entities.
pub fn delete_all() -> FluentDelete {
    FluentDelete {
        projections: Vec::new(),
    }
}

/// Fluent entry stage; only [`from`](FluentDelete::from) is available until
/// the family is named.
#[derive(Debug, Clone)]
pub struct FluentDelete {
    projections: Vec<String>,
}

impl FluentDelete {
    /// Names the family to delete from.
    pub fn from(self, family: impl Into<String>) -> DeleteFrom {
        DeleteFrom {
            query: DeleteQuery {
                family: family.into(),
                condition: None,
                projections: self.projections,
            },
        }
    }
}

/// Fluent stage after the family is known.
#[derive(Debug, Clone)]
pub struct DeleteFrom {
    query: DeleteQuery,
}

impl DeleteFrom {
    /// Starts a condition on the given field.
    pub fn where_(self, name: impl Into<String>) -> DeleteFilter {
        DeleteFilter {
            query: self.query,
            name: name.into(),
            negated: false,
            connector: Connector::Base,
        }
    }

    /// Builds the query.
    pub fn build(self) -> DeleteQuery {
        self.query
    }

    /// Builds the query and executes it against the manager.
    pub async fn execute<M: Manager + ?Sized>(self, manager: &M) -> EntityStoreResult<()> {
        manager.delete(self.build()).await
    }
}

/// Fluent stage holding a field name that still awaits its operator.
#[derive(Debug, Clone)]
pub struct DeleteFilter {
    query: DeleteQuery,
    name: String,
    negated: bool,
    connector: Connector,
}

impl DeleteFilter {
    fn apply(mut self, condition: FieldCondition) -> DeleteWhere {
        let condition = if self.negated {
            condition.negate()
        } else {
            condition
        };
        self.query.condition =
            Some(merge_condition(self.query.condition.take(), condition, self.connector));
        DeleteWhere { query: self.query }
    }

    /// Negates the condition produced by the next operator call.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Completes the condition with an equality operator.
    pub fn eq(self, value: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::eq(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a pattern-match operator.
    pub fn like(self, pattern: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::like(self.name.clone(), pattern);
        self.apply(condition)
    }

    /// Completes the condition with a greater-than operator.
    pub fn gt(self, value: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::gt(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a greater-than-or-equal operator.
    pub fn gte(self, value: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::gte(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a lesser-than operator.
    pub fn lt(self, value: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::lt(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with a lesser-than-or-equal operator.
    pub fn lte(self, value: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::lte(self.name.clone(), value);
        self.apply(condition)
    }

    /// Completes the condition with an inclusive range operator.
    pub fn between(self, from: impl Into<Bson>, to: impl Into<Bson>) -> DeleteWhere {
        let condition = FieldCondition::between(self.name.clone(), from, to);
        self.apply(condition)
    }

    /// Completes the condition with a list-membership operator.
    pub fn in_list(
        self,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> DeleteWhere {
        let condition = FieldCondition::in_list(self.name.clone(), values);
        self.apply(condition)
    }
}

/// Fluent stage with a complete condition tree.
#[derive(Debug, Clone)]
pub struct DeleteWhere {
    query: DeleteQuery,
}

impl DeleteWhere {
    /// Chains another condition under AND.
    pub fn and(self, name: impl Into<String>) -> DeleteFilter {
        DeleteFilter {
            query: self.query,
            name: name.into(),
            negated: false,
            connector: Connector::And,
        }
    }

    /// Chains another condition under OR.
    pub fn or(self, name: impl Into<String>) -> DeleteFilter {
        DeleteFilter {
            query: self.query,
            name: name.into(),
            negated: false,
            connector: Connector::Or,
        }
    }

    /// Builds the query.
    pub fn build(self) -> DeleteQuery {
        self.query
    }

    /// Builds the query and executes it against the manager.
    pub async fn execute<M: Manager + ?Sized>(self, manager: &M) -> EntityStoreResult<()> {
        manager.delete(self.build()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_and_builder_paths_are_equivalent() {
        let fluent = delete_all()
            .from("users")
            .where_("age")
            .gt(10)
            .and("name")
            .eq("Ada Lovelace")
            .build();

        let built = DeleteQuery::builder()
            .from("users")
            .filter(
                FieldCondition::gt("age", 10)
                    .and(FieldCondition::eq("name", "Ada Lovelace")),
            )
            .build()
            .unwrap();

        assert_eq!(fluent, built);
    }

    #[test]
    fn build_without_from_is_rejected() {
        let result = DeleteQuery::builder()
            .projections(["name"])
            .build();

        assert!(matches!(result, Err(EntityStoreError::InvalidState(_))));
    }

    #[test]
    fn field_deletes_carry_projections() {
        let query = delete(["age", "alias"]).from("users").build();

        assert_eq!(query.projections(), &["age", "alias"]);
        assert!(query.condition().is_none());
    }

    #[test]
    fn negated_condition() {
        let query = delete_all()
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
}
