//! The condition algebra for query filters.
//!
//! A [`FieldCondition`] encodes one operator of the closed [`Condition`] set
//! over a [`NamedField`]. Point conditions carry the comparison operand as
//! the field value; compound conditions (AND/OR/NOT) carry their children as
//! the value of a synthetic field named after the operator's reserved token.
//!
//! # Example
//!
//! ```ignore
//! use entitylayer_core::condition::FieldCondition;
//!
//! let condition = FieldCondition::eq("name", "Ada Lovelace")
//!     .and(FieldCondition::gt("age", 10));
//! ```

use bson::Bson;

use crate::{
    entity::NamedField,
    error::{EntityStoreError, EntityStoreResult},
    value::Value,
};

/// The closed set of condition operators.
///
/// Each operator carries a reserved field-name token used when a condition
/// must be embedded as a synthetic named field (compound conditions store
/// their children under that name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Field equals the operand.
    Equals,
    /// Field is strictly greater than the operand.
    GreaterThan,
    /// Field is greater than or equal to the operand.
    GreaterEqualsThan,
    /// Field is strictly lesser than the operand.
    LesserThan,
    /// Field is lesser than or equal to the operand.
    LesserEqualsThan,
    /// Field is contained in the operand list.
    In,
    /// Field matches the operand pattern (`%` wildcards).
    Like,
    /// Field lies inclusively between the operand pair.
    Between,
    /// All child conditions hold.
    And,
    /// At least one child condition holds.
    Or,
    /// The single child condition does not hold.
    Not,
}

impl Condition {
    /// Returns the reserved field-name token for this operator.
    pub fn field_name(self) -> &'static str {
        match self {
            Condition::Equals => "_EQUALS",
            Condition::GreaterThan => "_GREATER_THAN",
            Condition::GreaterEqualsThan => "_GREATER_EQUALS_THAN",
            Condition::LesserThan => "_LESSER_THAN",
            Condition::LesserEqualsThan => "_LESSER_EQUALS_THAN",
            Condition::In => "_IN",
            Condition::Like => "_LIKE",
            Condition::Between => "_BETWEEN",
            Condition::And => "_AND",
            Condition::Or => "_OR",
            Condition::Not => "_NOT",
        }
    }
}

/// A node of the boolean condition tree: a field paired with an operator.
///
/// Point conditions are built with the typed factories (`eq`, `gt`, ...);
/// compound conditions with the combinators ([`FieldCondition::and`],
/// [`FieldCondition::or`], [`FieldCondition::negate`]) or the variadic
/// [`FieldCondition::and_all`] / [`FieldCondition::or_all`] factories.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    field: NamedField,
    condition: Condition,
}

impl FieldCondition {
    /// Creates a condition from a pre-built field and operator, validating
    /// the operand structure.
    ///
    /// Point operators accept any payload shape; interpretation is deferred
    /// to the executing provider. BETWEEN requires a two-element array, IN
    /// requires an array, AND/OR require a child-condition list and NOT a
    /// single child condition. A deferred parameter is accepted everywhere a
    /// scalar is, since its shape is unknown until bind time.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidArgument`] when the payload does
    /// not match the operator's required structure.
    pub fn new(field: NamedField, condition: Condition) -> EntityStoreResult<Self> {
        match condition {
            Condition::Between => match field.value() {
                Value::Scalar(Bson::Array(items)) if items.len() == 2 => {}
                Value::Param(_) => {}
                _ => {
                    return Err(EntityStoreError::InvalidArgument(
                        "a BETWEEN condition requires exactly two values".to_string(),
                    ));
                }
            },
            Condition::In => match field.value() {
                Value::Scalar(Bson::Array(_)) | Value::Param(_) => {}
                _ => {
                    return Err(EntityStoreError::InvalidArgument(
                        "an IN condition requires a list of values".to_string(),
                    ));
                }
            },
            Condition::And | Condition::Or => {
                if field.value().as_conditions().is_none() {
                    return Err(EntityStoreError::InvalidArgument(
                        "a compound condition requires a list of child conditions".to_string(),
                    ));
                }
            }
            Condition::Not => {
                if field.value().as_condition().is_none() {
                    return Err(EntityStoreError::InvalidArgument(
                        "a negation requires exactly one child condition".to_string(),
                    ));
                }
            }
            _ => {}
        }

        Ok(Self { field, condition })
    }

    fn point(name: impl Into<String>, value: Bson, condition: Condition) -> Self {
        Self {
            field: NamedField::of(name, value),
            condition,
        }
    }

    /// Creates an equality condition.
    pub fn eq(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::point(name, value.into(), Condition::Equals)
    }

    /// Creates a greater-than condition.
    pub fn gt(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::point(name, value.into(), Condition::GreaterThan)
    }

    /// Creates a greater-than-or-equal condition.
    pub fn gte(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::point(name, value.into(), Condition::GreaterEqualsThan)
    }

    /// Creates a lesser-than condition.
    pub fn lt(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::point(name, value.into(), Condition::LesserThan)
    }

    /// Creates a lesser-than-or-equal condition.
    pub fn lte(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::point(name, value.into(), Condition::LesserEqualsThan)
    }

    /// Creates a pattern-match condition (`%` wildcards).
    pub fn like(name: impl Into<String>, pattern: impl Into<Bson>) -> Self {
        Self::point(name, pattern.into(), Condition::Like)
    }

    /// Creates a list-membership condition.
    pub fn in_list(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> Self {
        let items = values
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>();
        Self::point(name, Bson::Array(items), Condition::In)
    }

    /// Creates an inclusive range condition.
    pub fn between(
        name: impl Into<String>,
        from: impl Into<Bson>,
        to: impl Into<Bson>,
    ) -> Self {
        Self::point(
            name,
            Bson::Array(vec![from.into(), to.into()]),
            Condition::Between,
        )
    }

    /// Creates an AND condition over the given children, preserving input
    /// order without deduplication.
    pub fn and_all(conditions: impl IntoIterator<Item = FieldCondition>) -> Self {
        Self {
            field: NamedField::with_value(
                Condition::And.field_name(),
                Value::Conditions(conditions.into_iter().collect()),
            ),
            condition: Condition::And,
        }
    }

    /// Creates an OR condition over the given children, preserving input
    /// order without deduplication.
    pub fn or_all(conditions: impl IntoIterator<Item = FieldCondition>) -> Self {
        Self {
            field: NamedField::with_value(
                Condition::Or.field_name(),
                Value::Conditions(conditions.into_iter().collect()),
            ),
            condition: Condition::Or,
        }
    }

    /// Combines this condition with another under AND.
    ///
    /// If this condition is already an AND, the other condition is appended
    /// to its child list. Otherwise a new two-child AND is created.
    pub fn and(self, other: FieldCondition) -> FieldCondition {
        if self.condition == Condition::And {
            if let Value::Conditions(children) = self.field.value() {
                let mut children = children.to_vec();
                children.push(other);
                return FieldCondition::and_all(children);
            }
        }

        FieldCondition::and_all([self, other])
    }

    /// Combines this condition with another under OR.
    ///
    /// If this condition is already an OR, the other condition is appended
    /// to its child list. Otherwise a new two-child OR is created.
    pub fn or(self, other: FieldCondition) -> FieldCondition {
        if self.condition == Condition::Or {
            if let Value::Conditions(children) = self.field.value() {
                let mut children = children.to_vec();
                children.push(other);
                return FieldCondition::or_all(children);
            }
        }

        FieldCondition::or_all([self, other])
    }

    /// Negates this condition.
    ///
    /// Negating a NOT condition unwraps it, so double negation is identity.
    pub fn negate(self) -> FieldCondition {
        match self.field.value() {
            Value::Condition(inner) if self.condition == Condition::Not => (**inner).clone(),
            _ => FieldCondition {
                field: NamedField::with_value(
                    Condition::Not.field_name(),
                    Value::Condition(Box::new(self)),
                ),
                condition: Condition::Not,
            },
        }
    }

    /// Returns the field carrying this condition's operand.
    pub fn field(&self) -> &NamedField {
        &self.field
    }

    /// Returns this condition's operator.
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// Returns a copy of this condition with every reachable parameter cell
    /// replaced by its bound scalar.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if any reachable
    /// parameter is still unbound.
    pub fn resolved(&self) -> EntityStoreResult<FieldCondition> {
        Ok(FieldCondition {
            field: self.field.resolved()?,
            condition: self.condition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Param;

    #[test]
    fn eq_condition_shape() {
        let condition = FieldCondition::eq("name", "Ada Lovelace");

        assert_eq!(condition.condition(), Condition::Equals);
        assert_eq!(condition.field(), &NamedField::of("name", "Ada Lovelace"));
    }

    #[test]
    fn and_captures_both_children() {
        let combined = FieldCondition::eq("name", "Ada Lovelace")
            .and(FieldCondition::gt("age", 10));

        assert_eq!(combined.condition(), Condition::And);
        assert_eq!(combined.field().name(), "_AND");

        let children = combined
            .field()
            .value()
            .as_conditions()
            .unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains(&FieldCondition::eq("name", "Ada Lovelace")));
        assert!(children.contains(&FieldCondition::gt("age", 10)));
    }

    #[test]
    fn chained_and_appends() {
        let combined = FieldCondition::eq("name", "Ada Lovelace")
            .and(FieldCondition::gt("age", 10))
            .and(FieldCondition::lt("age", 80));

        let children = combined
            .field()
            .value()
            .as_conditions()
            .unwrap();
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn or_keeps_insertion_order() {
        let combined = FieldCondition::or_all([
            FieldCondition::eq("name", "Ada Lovelace"),
            FieldCondition::eq("name", "Grace Hopper"),
        ]);

        let children = combined
            .field()
            .value()
            .as_conditions()
            .unwrap();
        assert_eq!(children[0], FieldCondition::eq("name", "Ada Lovelace"));
        assert_eq!(children[1], FieldCondition::eq("name", "Grace Hopper"));
    }

    #[test]
    fn double_negation_is_identity() {
        let condition = FieldCondition::eq("name", "Ada Lovelace");

        let negated = condition.clone().negate();
        assert_eq!(negated.condition(), Condition::Not);
        assert_eq!(negated.field().name(), "_NOT");

        assert_eq!(negated.negate(), condition);
    }

    #[test]
    fn between_requires_a_pair() {
        let valid = NamedField::of("age", Bson::Array(vec![10.into(), 20.into()]));
        assert!(FieldCondition::new(valid, Condition::Between).is_ok());

        let too_many = NamedField::of(
            "age",
            Bson::Array(vec![10.into(), 20.into(), 30.into()]),
        );
        assert!(matches!(
            FieldCondition::new(too_many, Condition::Between),
            Err(EntityStoreError::InvalidArgument(_))
        ));

        let not_a_list = NamedField::of("age", 10);
        assert!(matches!(
            FieldCondition::new(not_a_list, Condition::Between),
            Err(EntityStoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn in_requires_a_list() {
        let valid = NamedField::of("name", Bson::Array(vec!["Ada".into()]));
        assert!(FieldCondition::new(valid, Condition::In).is_ok());

        let not_a_list = NamedField::of("name", "Ada");
        assert!(matches!(
            FieldCondition::new(not_a_list, Condition::In),
            Err(EntityStoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn params_defer_structural_validation() {
        let field = NamedField::with_value("age", Value::Param(Param::new("range")));
        assert!(FieldCondition::new(field, Condition::Between).is_ok());
    }

    #[test]
    fn resolved_replaces_bound_params() {
        let param = Param::new("age");
        let field = NamedField::with_value("age", Value::Param(param.clone()));
        let condition = FieldCondition::new(field, Condition::Equals).unwrap();

        param.bind(12);

        let resolved = condition.resolved().unwrap();
        assert_eq!(resolved, FieldCondition::eq("age", 12));
    }
}
