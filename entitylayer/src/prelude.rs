//! Convenient re-exports of commonly used types from entitylayer.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use entitylayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The entity model and value payloads
//! - Condition factories and combinators
//! - Fluent and explicit query builders
//! - The manager trait and its textual-query extension
//! - Provider registration and discovery
//! - Error types

pub use entitylayer_core::{
    condition::{Condition, FieldCondition},
    delete::{delete, delete_all, DeleteQuery, DeleteQueryBuilder},
    entity::{Entity, NamedField},
    error::{EntityStoreError, EntityStoreResult},
    manager::{EntityStream, Manager},
    observer::{IdentityObserver, QueryObserver},
    page::{Page, Pagination},
    parser::{ManagerQueryExt, Params, PreparedStatement, QueryParser},
    provider::{ManagerFactory, ProviderRegistry, Settings},
    query::{select, select_all, SelectQuery, SelectQueryBuilder, Sort, SortDirection},
    value::{Param, Value},
};
