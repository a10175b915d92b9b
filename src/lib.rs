//! Keystone: provider layer for an object-relational persistence framework.
//!
//! Two providers share one entity model:
//!
//! - **In-memory**: [`InMemoryProvider`] keeps rows in process, one table per
//!   primary-key descriptor, created lazily through the table registry.
//! - **Document store**: [`document_creator`] wires a document client into a
//!   [`DatabaseCreator`] that provisions the database and containers and seeds
//!   declared data on first creation.
//!
//! # Example
//!
//! ```ignore
//! let config = KeystoneConfig::from_file("keystone.toml")?;
//! let provider = InMemoryProvider::new(&config, Arc::new(model));
//! provider.ensure_created()?;
//! let blogs = provider.table("Blog")?;
//! ```

pub mod types;

pub use types::*;

use keystone_provision::DocumentSaveExecutor as Executor;
use std::sync::Arc;

/// In-memory provider: a model bound to an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryProvider {
    model: Arc<Model>,
    store: InMemoryStore,
}

impl InMemoryProvider {
    /// Create a provider. The store reads its logging options from `config` once.
    pub fn new(config: &KeystoneConfig, model: Arc<Model>) -> Self {
        Self {
            model,
            store: InMemoryStore::new(&config.logging),
        }
    }

    /// Model served by this provider.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Underlying store.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// Seed the model's data on first call. Returns `true` if seeding ran.
    pub fn ensure_created(&self) -> KeystoneResult<bool> {
        self.store.ensure_created(&self.model)
    }

    /// Clear all rows. Returns `true` if the store had been created.
    pub fn ensure_deleted(&self) -> bool {
        self.store.ensure_deleted()
    }

    /// Table of the named entity type.
    pub fn table(&self, entity: &str) -> KeystoneResult<Arc<dyn InMemoryTable>> {
        let entity_type = self.model.find_entity_type(entity).ok_or_else(|| {
            KeystoneError::configuration(format!("entity type '{}' is not in the model", entity))
        })?;
        self.store.table(entity_type)
    }
}

/// Build a [`DatabaseCreator`] that seeds through a [`DocumentSaveExecutor`]
/// over the same client.
pub fn document_creator<C>(
    client: Arc<C>,
    model: Arc<Model>,
    config: &KeystoneConfig,
) -> DatabaseCreator<C, Executor<C>> {
    let executor = Arc::new(Executor::new(Arc::clone(&client), &config.provisioning));
    DatabaseCreator::new(client, model, Arc::new(DefaultEntryTrackerFactory), executor)
        .with_options(config.provisioning.clone())
}
