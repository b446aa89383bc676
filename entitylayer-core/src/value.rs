//! Typed value payloads for fields, conditions and prepared statements.
//!
//! Every field of an entity carries a [`Value`]. Most values are plain BSON
//! scalars, but a value can also hold structural payloads: the child list of
//! a compound condition, the single child of a negation, a nested field list
//! representing a sub-entity, or a deferred named parameter that is resolved
//! only when a prepared statement binds it.

use std::sync::{Arc, RwLock};

use bson::{Bson, de::deserialize_from_bson};
use serde::de::DeserializeOwned;

use crate::{
    condition::FieldCondition,
    entity::{Entity, NamedField},
    error::{EntityStoreError, EntityStoreResult},
};

/// A named parameter cell shared between a prepared statement and every
/// field constructed from it.
///
/// Binding mutates the cell in place, so all holders observe the update.
/// Reading the cell before a value is bound fails with
/// [`EntityStoreError::UnboundParameter`].
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    cell: Arc<RwLock<Option<Bson>>>,
}

impl Param {
    /// Creates a new unbound parameter with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cell: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the parameter name (without the `@` sigil).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds a value to this parameter, overwriting any prior binding.
    pub fn bind(&self, value: impl Into<Bson>) {
        let mut guard = self
            .cell
            .write()
            .unwrap_or_else(|err| err.into_inner());
        *guard = Some(value.into());
    }

    /// Returns whether a value has been bound to this parameter.
    pub fn is_bound(&self) -> bool {
        self.cell
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .is_some()
    }

    /// Returns the bound value.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if no value has been
    /// bound yet.
    pub fn get(&self) -> EntityStoreResult<Bson> {
        self.cell
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
            .ok_or_else(|| EntityStoreError::UnboundParameter(self.name.clone()))
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        let left = self
            .cell
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone();
        let right = other
            .cell
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone();

        self.name == other.name && left == right
    }
}

/// The payload held by a [`NamedField`].
///
/// Scalar payloads cover every BSON shape including arrays and documents.
/// The structural variants exist so that condition trees and nested
/// sub-entities can themselves be stored as field values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A plain BSON payload.
    Scalar(Bson),
    /// An ordered list of named fields (a nested sub-entity).
    Fields(Vec<NamedField>),
    /// The ordered children of an AND/OR condition.
    Conditions(Vec<FieldCondition>),
    /// The single child of a NOT condition.
    Condition(Box<FieldCondition>),
    /// A deferred named parameter, resolved at bind time.
    Param(Param),
}

impl Value {
    /// Resolves this value to a plain BSON payload.
    ///
    /// Scalars resolve to themselves and parameters to their bound value.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] for an unbound
    /// parameter, and [`EntityStoreError::Conversion`] for structural
    /// payloads (field lists and condition trees), which have no scalar
    /// representation.
    pub fn get(&self) -> EntityStoreResult<Bson> {
        match self {
            Value::Scalar(bson) => Ok(bson.clone()),
            Value::Param(param) => param.get(),
            Value::Fields(_) => Err(EntityStoreError::Conversion(
                "a nested field list has no scalar representation".to_string(),
            )),
            Value::Conditions(_) | Value::Condition(_) => Err(EntityStoreError::Conversion(
                "a condition tree has no scalar representation".to_string(),
            )),
        }
    }

    /// Resolves this value and deserializes it into the requested type.
    ///
    /// # Errors
    ///
    /// Returns the resolution errors of [`Value::get`], or
    /// [`EntityStoreError::Conversion`] when the payload shape is
    /// incompatible with the requested type.
    pub fn get_as<T: DeserializeOwned>(&self) -> EntityStoreResult<T> {
        Ok(deserialize_from_bson(self.get()?)?)
    }

    /// Returns the nested field list, if this value holds one.
    pub fn as_fields(&self) -> Option<&[NamedField]> {
        match self {
            Value::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the AND/OR child conditions, if this value holds them.
    pub fn as_conditions(&self) -> Option<&[FieldCondition]> {
        match self {
            Value::Conditions(conditions) => Some(conditions),
            _ => None,
        }
    }

    /// Returns the negated child condition, if this value holds one.
    pub fn as_condition(&self) -> Option<&FieldCondition> {
        match self {
            Value::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    /// Returns the deferred parameter, if this value holds one.
    pub fn as_param(&self) -> Option<&Param> {
        match self {
            Value::Param(param) => Some(param),
            _ => None,
        }
    }

    /// Returns a deep copy of this value with every parameter cell replaced
    /// by its bound scalar.
    ///
    /// Providers use this to snapshot prepared inserts and updates before
    /// storing them, so later re-binds cannot mutate stored data.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if any reachable
    /// parameter is still unbound.
    pub fn resolved(&self) -> EntityStoreResult<Value> {
        match self {
            Value::Scalar(bson) => Ok(Value::Scalar(bson.clone())),
            Value::Param(param) => Ok(Value::Scalar(param.get()?)),
            Value::Fields(fields) => {
                let fields = fields
                    .iter()
                    .map(NamedField::resolved)
                    .collect::<EntityStoreResult<Vec<_>>>()?;
                Ok(Value::Fields(fields))
            }
            Value::Conditions(conditions) => {
                let conditions = conditions
                    .iter()
                    .map(FieldCondition::resolved)
                    .collect::<EntityStoreResult<Vec<_>>>()?;
                Ok(Value::Conditions(conditions))
            }
            Value::Condition(condition) => {
                Ok(Value::Condition(Box::new(condition.resolved()?)))
            }
        }
    }
}

impl From<Bson> for Value {
    fn from(bson: Bson) -> Self {
        Value::Scalar(bson)
    }
}

impl From<Param> for Value {
    fn from(param: Param) -> Self {
        Value::Param(param)
    }
}

impl From<Vec<NamedField>> for Value {
    fn from(fields: Vec<NamedField>) -> Self {
        Value::Fields(fields)
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        Value::Fields(entity.into_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_resolves_to_itself() {
        let value = Value::Scalar(Bson::from("Ada Lovelace"));
        assert_eq!(value.get().unwrap(), Bson::from("Ada Lovelace"));
        assert_eq!(value.get_as::<String>().unwrap(), "Ada Lovelace");
    }

    #[test]
    fn conversion_failure_is_reported() {
        let value = Value::Scalar(Bson::from("not a number"));
        assert!(matches!(
            value.get_as::<i64>(),
            Err(EntityStoreError::Conversion(_))
        ));
    }

    #[test]
    fn unbound_param_fails_on_read() {
        let value = Value::Param(Param::new("age"));
        assert!(matches!(
            value.get(),
            Err(EntityStoreError::UnboundParameter(name)) if name == "age"
        ));
    }

    #[test]
    fn later_binding_wins() {
        let param = Param::new("age");
        let value = Value::Param(param.clone());

        param.bind(10);
        param.bind(12);

        assert_eq!(value.get().unwrap(), Bson::from(12));
    }

    #[test]
    fn resolved_snapshots_the_binding() {
        let param = Param::new("age");
        param.bind(12);

        let snapshot = Value::Param(param.clone()).resolved().unwrap();
        param.bind(99);

        assert_eq!(snapshot.get().unwrap(), Bson::from(12));
    }
}
