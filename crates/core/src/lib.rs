//! Core types for Keystone
//!
//! This crate defines what the storage and provisioning crates share:
//! - Entity metadata: entity types, primary key descriptors, models
//! - Values, key values and rows
//! - Tracked entries and the tracker that stages them
//! - Save-executor contracts (blocking and async)
//! - Error types and configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metadata;
pub mod tracking;
pub mod traits;
pub mod value;

pub use config::{KeystoneConfig, LoggingOptions, ProvisioningOptions, DEFAULT_PARTITION_KEY_PATH};
pub use error::{KeystoneError, KeystoneResult};
pub use metadata::{EntityType, EntityTypeBuilder, KeyDescriptor, KeyProperty, KeyShape, Model, Property};
pub use tracking::{DefaultEntryTrackerFactory, EntityState, EntryTracker, EntryTrackerFactory, TrackedEntry};
pub use traits::{AsyncSaveExecutor, SaveExecutor, Support};
pub use value::{row, KeyValue, PrincipalKey, Row, ScalarType, Value};
