//! Named fields and the entity model.
//!
//! An [`Entity`] is a named, ordered collection of [`NamedField`]s
//! representing one record of a family. Field names are unique within an
//! entity: adding a field whose name already exists replaces the prior value
//! (last write wins) while keeping the field's original position.
//!
//! # Example
//!
//! ```ignore
//! use entitylayer_core::entity::{Entity, NamedField};
//!
//! let mut entity = Entity::of("users");
//! entity.set("name", "Alice");
//! entity.set("age", 30);
//!
//! assert_eq!(entity.len(), 2);
//! assert!(entity.contains("name"));
//! ```

use bson::{Bson, Document};
use serde::de::DeserializeOwned;

use crate::{
    error::{EntityStoreError, EntityStoreResult},
    value::Value,
};

/// A `(name, value)` pair; the atomic building block of entities and point
/// conditions.
///
/// Named fields are immutable once constructed. Two fields are equal iff
/// both name and value are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedField {
    name: String,
    value: Value,
}

impl NamedField {
    /// Creates a field holding a plain BSON payload.
    pub fn of(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self {
            name: name.into(),
            value: Value::Scalar(value.into()),
        }
    }

    /// Creates a field holding an arbitrary [`Value`] payload.
    ///
    /// This is the constructor used for structural payloads: nested field
    /// lists, condition trees and deferred parameters.
    pub fn with_value(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the field and returns its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Resolves the field value to a plain BSON payload.
    ///
    /// # Errors
    ///
    /// Propagates the resolution errors of [`Value::get`].
    pub fn get(&self) -> EntityStoreResult<Bson> {
        self.value.get()
    }

    /// Resolves the field value and deserializes it into the requested type.
    ///
    /// # Errors
    ///
    /// Propagates the resolution errors of [`Value::get_as`].
    pub fn get_as<T: DeserializeOwned>(&self) -> EntityStoreResult<T> {
        self.value.get_as()
    }

    /// Returns a copy of this field with every reachable parameter cell
    /// replaced by its bound scalar.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if any reachable
    /// parameter is still unbound.
    pub fn resolved(&self) -> EntityStoreResult<NamedField> {
        Ok(NamedField {
            name: self.name.clone(),
            value: self.value.resolved()?,
        })
    }
}

/// A named, ordered collection of fields representing one persisted record.
///
/// The entity name identifies the family (the table-like unit) the record
/// belongs to. Mutation is exclusively owned by the holder; entities claim
/// no internal synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    fields: Vec<NamedField>,
}

impl Entity {
    /// Creates an empty entity for the given family.
    pub fn of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Creates an entity from a family name and an initial field list.
    ///
    /// Duplicate names in the input collapse with last-write-wins semantics,
    /// exactly as repeated [`Entity::add`] calls would.
    pub fn of_fields(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = NamedField>,
    ) -> Self {
        let mut entity = Entity::of(name);
        entity.add_all(fields);
        entity
    }

    /// Creates an entity from a family name and a BSON document.
    ///
    /// Each document entry becomes one scalar field, in document order.
    pub fn of_map(name: impl Into<String>, map: Document) -> Self {
        Entity::of_fields(
            name,
            map.into_iter()
                .map(|(key, value)| NamedField::of(key, value)),
        )
    }

    /// Returns the family name of this entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field, replacing any existing field with the same name.
    ///
    /// Replacement keeps the field's original position.
    pub fn add(&mut self, field: NamedField) {
        match self
            .fields
            .iter_mut()
            .find(|existing| existing.name() == field.name())
        {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Adds every field of the iterator with [`Entity::add`] semantics.
    pub fn add_all(&mut self, fields: impl IntoIterator<Item = NamedField>) {
        for field in fields {
            self.add(field);
        }
    }

    /// Adds a scalar field, replacing any existing field with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Bson>) {
        self.add(NamedField::of(name, value));
    }

    /// Removes the field with the given name.
    ///
    /// Returns `true` if a field was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.fields.iter().position(|field| field.name() == name) {
            Some(index) => {
                self.fields.remove(index);
                true
            }
            None => false,
        }
    }

    /// Looks up a field by name.
    pub fn find(&self, name: &str) -> Option<&NamedField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Looks up a field by name and converts its value to the requested type.
    ///
    /// Returns `Ok(None)` when no field with that name exists.
    ///
    /// # Errors
    ///
    /// Propagates the conversion and resolution errors of
    /// [`Value::get_as`].
    pub fn find_value<T: DeserializeOwned>(&self, name: &str) -> EntityStoreResult<Option<T>> {
        self.find(name)
            .map(NamedField::get_as)
            .transpose()
    }

    /// Returns whether a field with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the entity has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Removes all fields.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Returns the field names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(NamedField::name)
            .collect()
    }

    /// Returns the field values in insertion order.
    pub fn values(&self) -> Vec<&Value> {
        self.fields
            .iter()
            .map(NamedField::value)
            .collect()
    }

    /// Returns the fields in insertion order.
    pub fn fields(&self) -> &[NamedField] {
        &self.fields
    }

    /// Consumes the entity and returns its fields.
    pub fn into_fields(self) -> Vec<NamedField> {
        self.fields
    }

    /// Lowers the entity into a plain BSON document of name to resolved
    /// value.
    ///
    /// Nested field lists lower recursively: each nested field becomes a
    /// one-entry map, and the resulting list collapses to that single map
    /// when it has exactly one element.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] for unresolved
    /// parameters and [`EntityStoreError::Conversion`] for condition-tree
    /// payloads, which have no map representation.
    pub fn to_map(&self) -> EntityStoreResult<Document> {
        let mut map = Document::new();

        for field in &self.fields {
            map.insert(field.name().to_string(), lower(field.value())?);
        }

        Ok(map)
    }

    /// Lowers the entity to a JSON value via [`Entity::to_map`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Entity::to_map`], plus serialization
    /// failures.
    pub fn to_json(&self) -> EntityStoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self.to_map()?)?)
    }

    /// Returns a deep copy of this entity with every parameter cell replaced
    /// by its bound scalar.
    ///
    /// Providers snapshot prepared inserts and updates with this before
    /// storing them, so later re-binds cannot mutate stored data.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if any reachable
    /// parameter is still unbound.
    pub fn resolved(&self) -> EntityStoreResult<Entity> {
        Ok(Entity {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(NamedField::resolved)
                .collect::<EntityStoreResult<Vec<_>>>()?,
        })
    }
}

/// Lowers one field value into its map representation.
fn lower(value: &Value) -> EntityStoreResult<Bson> {
    match value {
        Value::Scalar(bson) => Ok(bson.clone()),
        Value::Param(param) => Ok(param.get()?),
        Value::Fields(fields) => {
            let mut docs = fields
                .iter()
                .map(|field| {
                    let mut doc = Document::new();
                    doc.insert(field.name().to_string(), lower(field.value())?);
                    Ok(doc)
                })
                .collect::<EntityStoreResult<Vec<_>>>()?;

            // A singleton nested list collapses to the single map.
            if docs.len() == 1 {
                Ok(Bson::Document(docs.remove(0)))
            } else {
                Ok(Bson::Array(docs.into_iter().map(Bson::Document).collect()))
            }
        }
        Value::Conditions(_) | Value::Condition(_) => Err(EntityStoreError::Conversion(
            "a condition tree has no map representation".to_string(),
        )),
    }
}
