//! Condition evaluation for in-memory entity filtering.
//!
//! This module provides the evaluation engine for condition trees, enabling
//! filtering and comparison operations on stored entities.

use std::{cmp::Ordering, collections::HashMap};

use bson::{datetime::DateTime, Bson};

use entitylayer_core::{
    condition::{Condition, FieldCondition},
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
};

/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// condition evaluation and sorting. It normalizes numeric types to f64 so
/// integers of different widths compare naturally.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates condition trees against one entity.
pub(crate) struct ConditionEvaluator<'a> {
    entity: &'a Entity,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(entity: &'a Entity) -> Self {
        Self { entity }
    }

    /// Returns the entities matching the condition, in input order.
    ///
    /// Evaluation errors (unbound parameters, malformed operands) propagate
    /// instead of silently dropping entities.
    pub fn filter_entities(
        entities: impl IntoIterator<Item = &'a Entity>,
        condition: &FieldCondition,
    ) -> EntityStoreResult<Vec<Entity>> {
        let mut matches = Vec::new();

        for entity in entities {
            if ConditionEvaluator::new(entity).evaluate(condition)? {
                matches.push(entity.clone());
            }
        }

        Ok(matches)
    }

    pub fn evaluate(&self, condition: &FieldCondition) -> EntityStoreResult<bool> {
        match condition.condition() {
            Condition::And => {
                for child in self.children(condition)? {
                    if !self.evaluate(child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or => {
                for child in self.children(condition)? {
                    if self.evaluate(child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not => {
                let child = condition
                    .field()
                    .value()
                    .as_condition()
                    .ok_or_else(|| {
                        EntityStoreError::InvalidArgument(
                            "a negation requires exactly one child condition".to_string(),
                        )
                    })?;
                Ok(!self.evaluate(child)?)
            }
            point => self.point(condition, point),
        }
    }

    fn children<'c>(
        &self,
        condition: &'c FieldCondition,
    ) -> EntityStoreResult<&'c [FieldCondition]> {
        condition
            .field()
            .value()
            .as_conditions()
            .ok_or_else(|| {
                EntityStoreError::InvalidArgument(
                    "a compound condition requires a list of child conditions".to_string(),
                )
            })
    }

    fn point(&self, condition: &FieldCondition, operator: Condition) -> EntityStoreResult<bool> {
        let operand = condition.field().get()?;

        let actual = match self.entity.find(condition.field().name()) {
            Some(field) => field.get()?,
            None => return Ok(false),
        };

        match operator {
            Condition::Equals => Ok(Comparable::from(&actual) == Comparable::from(&operand)),
            Condition::GreaterThan
            | Condition::GreaterEqualsThan
            | Condition::LesserThan
            | Condition::LesserEqualsThan => {
                match Comparable::from(&actual).partial_cmp(&Comparable::from(&operand)) {
                    Some(ordering) => Ok(match operator {
                        Condition::GreaterThan => ordering == Ordering::Greater,
                        Condition::GreaterEqualsThan => ordering != Ordering::Less,
                        Condition::LesserThan => ordering == Ordering::Less,
                        Condition::LesserEqualsThan => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            }
            Condition::Like => match (&actual, &operand) {
                (Bson::String(text), Bson::String(pattern)) => Ok(like_match(text, pattern)),
                _ => Ok(false),
            },
            Condition::In => match &operand {
                Bson::Array(candidates) => Ok(candidates
                    .iter()
                    .any(|candidate| Comparable::from(&actual) == Comparable::from(candidate))),
                _ => Err(EntityStoreError::InvalidArgument(
                    "an IN condition requires a list of values".to_string(),
                )),
            },
            Condition::Between => match &operand {
                Bson::Array(bounds) if bounds.len() == 2 => {
                    let value = Comparable::from(&actual);
                    let from = Comparable::from(&bounds[0]);
                    let to = Comparable::from(&bounds[1]);

                    let above = matches!(
                        value.partial_cmp(&from),
                        Some(Ordering::Greater) | Some(Ordering::Equal)
                    );
                    let below = matches!(
                        value.partial_cmp(&to),
                        Some(Ordering::Less) | Some(Ordering::Equal)
                    );
                    Ok(above && below)
                }
                _ => Err(EntityStoreError::InvalidArgument(
                    "a BETWEEN condition requires exactly two values".to_string(),
                )),
            },
            _ => unreachable!("compound operators are handled in evaluate"),
        }
    }
}

/// Matches a text against a pattern where `%` stands for any run of
/// characters. A pattern without `%` must match exactly.
fn like_match(text: &str, pattern: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();

    if segments.len() == 1 {
        return text == pattern;
    }

    let first = segments[0];
    if !text.starts_with(first) {
        return false;
    }
    let mut rest = &text[first.len()..];

    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(index) => rest = &rest[index + segment.len()..],
            None => return false,
        }
    }

    let last = segments[segments.len() - 1];
    last.is_empty() || rest.ends_with(last)
}
