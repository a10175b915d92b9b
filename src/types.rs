//! Public types for the Keystone facade.
//!
//! This module re-exports types from internal crates with a clean public interface.

// ============================================================================
// Metadata model
// ============================================================================

pub use keystone_core::{EntityType, EntityTypeBuilder, KeyDescriptor, KeyProperty, KeyShape, Model, Property};

// ============================================================================
// Values and keys
// ============================================================================

pub use keystone_core::{row, KeyValue, PrincipalKey, Row, ScalarType, Value};

// ============================================================================
// Change tracking and save contracts
// ============================================================================

pub use keystone_core::{
    AsyncSaveExecutor, DefaultEntryTrackerFactory, EntityState, EntryTracker, EntryTrackerFactory,
    SaveExecutor, Support, TrackedEntry,
};

// ============================================================================
// Errors and configuration
// ============================================================================

pub use keystone_core::{KeystoneConfig, KeystoneError, KeystoneResult, LoggingOptions, ProvisioningOptions};

// ============================================================================
// Storage and provisioning
// ============================================================================

pub use keystone_storage::{InMemoryStore, InMemoryTable, TableRegistry, TableRows};
pub use keystone_provision::{
    AsyncDocumentClient, ClientOperation, DatabaseCreator, DocumentClient, DocumentSaveExecutor,
    MemoryDocumentClient,
};

// Cancellation token accepted by every async operation
pub use tokio_util::sync::CancellationToken;
