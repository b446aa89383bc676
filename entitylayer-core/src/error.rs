//! Error types and result types for data access operations.
//!
//! This module provides the error taxonomy shared by the model types, the
//! query builders, the text query parser and the provider-facing manager
//! interface. Use [`EntityStoreResult<T>`] as the return type for fallible
//! operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when building or executing
/// queries against an entity store.
///
/// This enum covers value conversion failures, structural validation of
/// condition operands, builder state errors, the textual query grammar, and
/// provider-side errors that the core propagates untouched.
#[derive(Error, Debug)]
pub enum EntityStoreError {
    /// A value could not be converted to the requested type.
    #[error("Conversion error: {0}")]
    Conversion(String),
    /// A structurally invalid operand was supplied to an operation
    /// (for example a BETWEEN condition whose payload is not a pair).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A builder reached a terminal operation without a mandatory
    /// precondition being satisfied.
    #[error("Invalid builder state: {0}")]
    InvalidState(String),
    /// The textual query grammar failed to parse.
    #[error("Query syntax error: {0}")]
    Syntax(String),
    /// A named parameter was read before a value was bound to it.
    #[error("Parameter @{0} is not bound")]
    UnboundParameter(String),
    /// A single-result read matched more than one entity.
    /// The argument is the family the query targeted.
    #[error("Non-unique result for family {0}")]
    NonUniqueResult(String),
    /// A provider declined an optional capability.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// No provider is registered for the requested capability.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
    /// More than one provider candidate was found when exactly one
    /// was required.
    #[error("Non-unique provider: {0}")]
    NonUniqueProvider(String),
    /// The referenced entity does not exist in the family.
    /// The first argument is the entity key, the second is the family name.
    #[error("Entity {0} not found in family {1}")]
    EntityNotFound(String, String),
    /// An error occurred in the underlying provider.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// A specialized `Result` type for entity store operations.
///
/// This type alias is used throughout the crate to indicate operations that
/// may fail with an [`EntityStoreError`].
pub type EntityStoreResult<T> = Result<T, EntityStoreError>;

impl From<BsonError> for EntityStoreError {
    fn from(err: BsonError) -> Self {
        EntityStoreError::Conversion(err.to_string())
    }
}

impl From<SerdeJsonError> for EntityStoreError {
    fn from(err: SerdeJsonError) -> Self {
        EntityStoreError::Conversion(err.to_string())
    }
}
