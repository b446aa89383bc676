//! Main entitylayer crate providing a unified interface for NoSQL data
//! access.
//!
//! This crate is the primary entry point for users of the entitylayer
//! project. It re-exports the core model and query types from
//! `entitylayer-core` and provides convenient access to the bundled
//! in-memory provider.
//!
//! # Features
//!
//! - **Vendor-neutral model** - Entities, named fields and typed values shared by every provider
//! - **Composable conditions** - Point predicates combined into AND/OR/NOT trees
//! - **Two builder styles** - A staged fluent chain and an explicit builder producing equal queries
//! - **Textual queries** - A small query grammar with named-parameter prepared statements
//! - **Pluggable providers** - Managers located through an explicit provider registry
//!
//! # Quick Start
//!
//! ```ignore
//! use entitylayer::{prelude::*, memory::InMemoryManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = InMemoryManager::new();
//!
//!     // Insert an entity
//!     let mut user = Entity::of("users");
//!     user.set("name", "Alice");
//!     user.set("age", 30);
//!     manager.insert(user).await.unwrap();
//!
//!     // Query it back through the fluent builder
//!     let found = select_all()
//!         .from("users")
//!         .where_("name")
//!         .eq("Alice")
//!         .execute_single(&manager)
//!         .await
//!         .unwrap();
//!
//!     println!("Queried user: {found:?}");
//! }
//! ```
//!
//! # Textual Queries
//!
//! Every manager also accepts the textual grammar, including named
//! parameters through prepared statements:
//!
//! ```ignore
//! use entitylayer::{prelude::*, memory::InMemoryManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = InMemoryManager::new();
//!
//!     manager
//!         .query("insert users (name = \"Alice\", age = 30)")
//!         .await
//!         .unwrap();
//!
//!     let mut statement = manager
//!         .prepare("select * from users where age = @age")
//!         .unwrap();
//!     statement.bind("age", 30).unwrap();
//!
//!     let found = statement.get_single_result().await.unwrap();
//!     println!("Queried user: {found:?}");
//! }
//! ```
//!
//! # Providers
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//!
//! Other providers implement [`manager::Manager`](entitylayer_core::manager::Manager)
//! and register a factory in a
//! [`ProviderRegistry`](entitylayer_core::provider::ProviderRegistry).

pub mod prelude;

pub use entitylayer_core::{
    condition, delete, entity, error, manager, observer, page, parser, provider, query, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory provider implementations.
pub mod memory {
    pub use entitylayer_memory::{InMemoryManager, InMemoryManagerBuilder, ID_FIELD};
}
