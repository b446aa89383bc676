//! A vendor-neutral NoSQL data access abstraction layer.
//!
//! This crate is the core of the entitylayer project and provides:
//!
//! - **Entity model** ([`entity`], [`value`]) - Named fields, entities and typed value payloads
//! - **Condition algebra** ([`condition`]) - Point predicates composed into AND/OR/NOT trees
//! - **Query construction** ([`query`], [`delete`]) - Fluent and explicit builders over one shared query model
//! - **Textual queries** ([`parser`]) - A small query grammar with named-parameter prepared statements
//! - **Manager interface** ([`manager`]) - The async boundary implemented by store providers
//! - **Provider discovery** ([`provider`]) - An explicit registry of named provider factories
//! - **Observer seam** ([`observer`]) - Identifier rewriting for object-mapping layers
//! - **Pagination** ([`page`]) - Skip/limit windows and result pages
//! - **Error handling** ([`error`]) - The shared error taxonomy and result type
//!
//! # Example
//!
//! ```ignore
//! use entitylayer_core::query::select_all;
//!
//! let query = select_all()
//!     .from("God")
//!     .where_("age")
//!     .gt(10)
//!     .order_by("name")
//!     .asc()
//!     .build();
//!
//! let gods = manager.select(query).await?;
//! # Ok::<(), entitylayer_core::error::EntityStoreError>(())
//! ```
//!
//! There is no storage engine here: every query is dispatched to a
//! [`manager::Manager`] implemented by a provider crate.

#[allow(unused_extern_crates)]
extern crate self as entitylayer_core;

pub mod condition;
pub mod delete;
pub mod entity;
pub mod error;
pub mod manager;
pub mod observer;
pub mod page;
pub mod parser;
pub mod provider;
pub mod query;
pub mod value;
