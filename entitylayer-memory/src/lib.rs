//! In-memory entity store provider for entitylayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `Manager` trait. It uses async-aware read-write locks for concurrent
//! access and is ideal for development, testing and as a reference for
//! provider behavior.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Full query support** - Condition trees, multi-key sorting, skip/limit windows and projections
//! - **Time-to-live** - Entities inserted with a TTL disappear once expired
//! - **Generated keys** - Inserts assign each entity an `_id` field used by updates
//!
//! # Quick Start
//!
//! ```ignore
//! use entitylayer_memory::InMemoryManager;
//! use entitylayer_core::{entity::Entity, manager::Manager, query::select_all};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = InMemoryManager::new();
//!
//!     let mut user = Entity::of("users");
//!     user.set("name", "Alice");
//!     let stored = manager.insert(user).await?;
//!
//!     let found = manager
//!         .select(select_all().from("users").build())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as entitylayer_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryManager, InMemoryManagerBuilder, ID_FIELD};
