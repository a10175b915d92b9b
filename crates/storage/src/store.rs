//! In-memory store
//!
//! Stateful backend for the in-memory provider: owns the [`TableRegistry`]
//! and applies tracked entries to its tables.
//!
//! Entries are applied in order. A failing entry stops the save; entries
//! before it stay applied.

use crate::registry::TableRegistry;
use crate::table::InMemoryTable;
use async_trait::async_trait;
use keystone_core::config::LoggingOptions;
use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::metadata::{EntityType, Model};
use keystone_core::tracking::{
    DefaultEntryTrackerFactory, EntityState, EntryTrackerFactory, TrackedEntry,
};
use keystone_core::traits::{AsyncSaveExecutor, SaveExecutor};
use keystone_core::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// In-process database made of [`InMemoryTable`]s.
#[derive(Debug)]
pub struct InMemoryStore {
    registry: TableRegistry,
    created: Mutex<bool>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new(options: &LoggingOptions) -> Self {
        Self {
            registry: TableRegistry::new(options),
            created: Mutex::new(false),
        }
    }

    /// The store's table registry.
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Table for `entity_type`, created on first use.
    pub fn table(&self, entity_type: &EntityType) -> KeystoneResult<Arc<dyn InMemoryTable>> {
        self.registry.get_or_create(entity_type)
    }

    /// Seed `model` into the store the first time this is called.
    ///
    /// Returns `true` if seeding ran, `false` if the store was already created.
    /// A failed seed leaves the store marked as not created.
    pub fn ensure_created(&self, model: &Model) -> KeystoneResult<bool> {
        let mut created = self.created.lock();
        if *created {
            return Ok(false);
        }

        let mut tracker = DefaultEntryTrackerFactory.create();
        for entity_type in model.entity_types() {
            for seed in entity_type.seed_data() {
                tracker
                    .create_entry(seed.clone(), entity_type)
                    .set_state(EntityState::Added);
            }
        }

        let applied = self.save_changes(&tracker.entries_to_save())?;
        info!(target: "keystone::storage", seeded = applied, "in-memory store created");
        *created = true;
        Ok(true)
    }

    /// Remove all rows and mark the store as not created.
    ///
    /// Tables themselves stay registered. Returns `true` if the store had
    /// been created.
    pub fn ensure_deleted(&self) -> bool {
        let mut created = self.created.lock();
        for table in self.registry.tables() {
            table.clear();
        }
        let was_created = *created;
        *created = false;
        debug!(target: "keystone::storage", was_created, "in-memory store cleared");
        was_created
    }

    fn apply(&self, entry: &TrackedEntry) -> KeystoneResult<bool> {
        let entity_type = entry.entity_type();
        match entry.state() {
            EntityState::Detached | EntityState::Unchanged => Ok(false),
            EntityState::Added => {
                entity_type.validate_row(entry.values())?;
                self.table(entity_type)?.insert(entry.values().clone())?;
                Ok(true)
            }
            EntityState::Modified => {
                entity_type.validate_row(entry.values())?;
                self.table(entity_type)?.update(entry.values().clone())?;
                Ok(true)
            }
            EntityState::Deleted => {
                let key_values = key_values(entity_type, entry)?;
                self.table(entity_type)?.remove(&key_values)?;
                Ok(true)
            }
        }
    }
}

fn key_values(entity_type: &EntityType, entry: &TrackedEntry) -> KeystoneResult<Vec<Value>> {
    let descriptor = entity_type.primary_key().ok_or_else(|| {
        KeystoneError::configuration(format!(
            "entity type '{}' has no primary key",
            entity_type.name()
        ))
    })?;
    Ok(descriptor
        .properties()
        .iter()
        .map(|p| entry.values().get(&p.name).cloned().unwrap_or(Value::Null))
        .collect())
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(&LoggingOptions::default())
    }
}

impl SaveExecutor for InMemoryStore {
    fn save_changes(&self, entries: &[TrackedEntry]) -> KeystoneResult<usize> {
        let mut applied = 0;
        for entry in entries {
            if self.apply(entry)? {
                applied += 1;
            }
        }
        debug!(target: "keystone::storage", applied, "entries saved");
        Ok(applied)
    }
}

#[async_trait]
impl AsyncSaveExecutor for InMemoryStore {
    async fn save_changes_async(
        &self,
        entries: Vec<TrackedEntry>,
        cancel: &CancellationToken,
    ) -> KeystoneResult<usize> {
        if cancel.is_cancelled() {
            return Err(KeystoneError::Cancelled);
        }
        self.save_changes(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::tracking::EntryTracker;
    use keystone_core::value::{row, ScalarType};

    fn model() -> Model {
        let blog = EntityType::builder("Blog")
            .property("id", ScalarType::Int)
            .property("url", ScalarType::String)
            .key(["id"])
            .seed(row([("id", Value::Int(1)), ("url", Value::from("a.example"))]))
            .seed(row([("id", Value::Int(2)), ("url", Value::from("b.example"))]))
            .build()
            .unwrap();
        let tag = EntityType::builder("Tag")
            .property("label", ScalarType::String)
            .key(["label"])
            .build()
            .unwrap();
        Model::new([blog, tag]).unwrap()
    }

    #[test]
    fn test_ensure_created_seeds_once() {
        let store = InMemoryStore::default();
        let model = model();
        assert!(store.ensure_created(&model).unwrap());
        assert!(!store.ensure_created(&model).unwrap());

        let blog = model.find_entity_type("Blog").unwrap();
        assert_eq!(store.table(blog).unwrap().len(), 2);
    }

    #[test]
    fn test_ensure_deleted_clears_rows_and_allows_reseed() {
        let store = InMemoryStore::default();
        let model = model();
        assert!(!store.ensure_deleted());
        store.ensure_created(&model).unwrap();

        let blog = model.find_entity_type("Blog").unwrap();
        let table = store.table(blog).unwrap();
        assert!(store.ensure_deleted());
        assert!(table.is_empty());

        assert!(store.ensure_created(&model).unwrap());
        assert!(Arc::ptr_eq(&table, &store.table(blog).unwrap()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_save_changes_applies_each_state() {
        let store = InMemoryStore::default();
        let model = model();
        store.ensure_created(&model).unwrap();
        let blog = model.find_entity_type("Blog").unwrap();

        let mut tracker = EntryTracker::new();
        tracker
            .create_entry(row([("id", Value::Int(3)), ("url", Value::from("c"))]), blog)
            .set_state(EntityState::Added);
        tracker
            .create_entry(row([("id", Value::Int(1)), ("url", Value::from("a2"))]), blog)
            .set_state(EntityState::Modified);
        tracker
            .create_entry(row([("id", Value::Int(2)), ("url", Value::from("b"))]), blog)
            .set_state(EntityState::Deleted);
        tracker
            .create_entry(row([("id", Value::Int(9)), ("url", Value::from("z"))]), blog)
            .set_state(EntityState::Unchanged);

        let applied = store.save_changes(&tracker.entries_to_save()).unwrap();
        assert_eq!(applied, 3);

        let table = store.table(blog).unwrap();
        let ids: Vec<_> = table.rows().iter().map(|r| r.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Int(1)), Some(Value::Int(3))]);
        assert_eq!(
            table.find(&[Value::Int(1)]).unwrap().unwrap().get("url"),
            Some(&Value::from("a2"))
        );
    }

    #[test]
    fn test_invalid_row_rejected() {
        let store = InMemoryStore::default();
        let model = model();
        let blog = model.find_entity_type("Blog").unwrap();
        let mut entry = TrackedEntry::new(Arc::clone(blog), row([("id", Value::Int(1))]));
        entry.set_state(EntityState::Added);
        let err = store.save_changes(&[entry]).unwrap_err();
        assert!(matches!(err, KeystoneError::InvalidValue { .. }));
    }

    #[test]
    fn test_failed_seed_leaves_store_uncreated() {
        let dup = EntityType::builder("Dup")
            .property("id", ScalarType::Int)
            .key(["id"])
            .seed(row([("id", Value::Int(1))]))
            .seed(row([("id", Value::Int(1))]))
            .build()
            .unwrap();
        let model = Model::new([dup]).unwrap();
        let store = InMemoryStore::default();
        let err = store.ensure_created(&model).unwrap_err();
        assert!(matches!(err, KeystoneError::DuplicateKey { .. }));
        assert!(!store.ensure_deleted());
    }

    #[tokio::test]
    async fn test_async_save_honours_cancellation() {
        let store = InMemoryStore::default();
        let model = model();
        let blog = model.find_entity_type("Blog").unwrap();
        let mut entry = TrackedEntry::new(
            Arc::clone(blog),
            row([("id", Value::Int(7)), ("url", Value::from("x"))]),
        );
        entry.set_state(EntityState::Added);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = store
            .save_changes_async(vec![entry.clone()], &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(store.registry().is_empty());

        let applied = store
            .save_changes_async(vec![entry], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }
}
