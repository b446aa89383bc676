//! The identifier-rewrite seam between the query parser and a mapping layer.
//!
//! The parser invokes a [`QueryObserver`] once per parsed entity name and
//! once per parsed field name, letting a caller (typically an object-mapping
//! layer) rewrite identifiers before they reach the manager. The parser owns
//! no rewriting logic itself; the default implementation passes every name
//! through unchanged.

/// Rewrites entity and field names during query parsing.
pub trait QueryObserver: Sync {
    /// Maps a parsed entity (family) name to the name handed to the manager.
    fn fire_entity(&self, name: &str) -> String {
        name.to_string()
    }

    /// Maps a parsed field name to the name handed to the manager.
    fn fire_field(&self, name: &str) -> String {
        name.to_string()
    }
}

/// The pass-through observer used when no mapping layer is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityObserver;

impl QueryObserver for IdentityObserver {}
