//! Storage layer for Keystone
//!
//! This crate implements the in-memory provider's storage engine:
//! - IdentityCache: create-on-miss cache, one construction per identity
//! - Key-value factories: principal key extraction per key shape
//! - MemoryTable: rows of one entity type keyed by principal key
//! - TableRegistry: one table per primary-key descriptor
//! - InMemoryStore: applies tracked entries to the registry's tables

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod key_factory;
pub mod registry;
pub mod store;
pub mod table;

pub use cache::IdentityCache;
pub use key_factory::{key_value_factory, CompositeKeyValueFactory, KeyValueFactory, SimpleKeyValueFactory};
pub use registry::TableRegistry;
pub use store::InMemoryStore;
pub use table::{InMemoryTable, MemoryTable, TableRows};
