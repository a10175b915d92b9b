//! Table registry.
//!
//! Maps each primary-key descriptor to the single in-memory table that stores
//! rows for it. Tables are built lazily on first request and live as long as
//! the registry.
//!
//! # Design
//!
//! - Composes an [`IdentityCache`] keyed by [`KeyDescriptor`]
//! - The key factory is resolved once per table, inside the cache's init
//! - The sensitive-logging flag is read once from [`LoggingOptions`] and
//!   copied into every table
//!
//! # Example
//!
//! ```ignore
//! let registry = TableRegistry::new(&LoggingOptions::default());
//! let table = registry.get_or_create(&blog)?;
//! table.insert(row)?;
//! ```

use crate::cache::IdentityCache;
use crate::key_factory::key_value_factory;
use crate::table::{InMemoryTable, MemoryTable};
use keystone_core::config::LoggingOptions;
use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::metadata::{EntityType, KeyDescriptor};
use std::sync::Arc;
use tracing::debug;

/// Identity-keyed registry of in-memory tables.
pub struct TableRegistry {
    tables: IdentityCache<KeyDescriptor, Arc<dyn InMemoryTable>>,
    sensitive_logging: bool,
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new(options: &LoggingOptions) -> Self {
        Self {
            tables: IdentityCache::new(),
            sensitive_logging: options.sensitive_data_logging,
        }
    }

    /// Get the table for `entity_type`, creating it on first use.
    ///
    /// # Errors
    ///
    /// [`KeystoneError::Configuration`] if the entity type has no primary key
    /// or its key cannot back a table. No table is registered in that case.
    pub fn get_or_create(&self, entity_type: &EntityType) -> KeystoneResult<Arc<dyn InMemoryTable>> {
        let descriptor = entity_type.primary_key().ok_or_else(|| {
            KeystoneError::configuration(format!(
                "entity type '{}' has no primary key; in-memory tables require one",
                entity_type.name()
            ))
        })?;

        self.tables.get_or_try_insert_with::<KeystoneError, _>(descriptor, || {
            let factory = key_value_factory(descriptor)?;
            debug!(
                target: "keystone::storage",
                entity = entity_type.name(),
                key_properties = descriptor.properties().len(),
                sensitive_logging = self.sensitive_logging,
                "creating in-memory table"
            );
            let table: Arc<dyn InMemoryTable> =
                Arc::new(MemoryTable::new(factory, self.sensitive_logging));
            Ok(table)
        })
    }

    /// Get an existing table without creating one.
    pub fn get(&self, descriptor: &KeyDescriptor) -> Option<Arc<dyn InMemoryTable>> {
        self.tables.get(descriptor)
    }

    /// All tables created so far.
    pub fn tables(&self) -> Vec<Arc<dyn InMemoryTable>> {
        self.tables.values()
    }

    /// Number of tables created so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if no table has been created.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Sensitive-logging flag threaded into every table.
    pub fn sensitive_logging_enabled(&self) -> bool {
        self.sensitive_logging
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(&LoggingOptions::default())
    }
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("tables", &self.len())
            .field("sensitive_logging", &self.sensitive_logging)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::value::{row, ScalarType, Value};
    use std::sync::Barrier;
    use std::thread;

    fn entity(name: &str) -> EntityType {
        EntityType::builder(name)
            .property("id", ScalarType::Int)
            .key(["id"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_same_descriptor_same_table() {
        let registry = TableRegistry::default();
        let blog = entity("Blog");
        let a = registry.get_or_create(&blog).unwrap();
        let b = registry.get_or_create(&blog).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_descriptors_distinct_tables() {
        let registry = TableRegistry::default();
        let a = registry.get_or_create(&entity("Blog")).unwrap();
        let b = registry.get_or_create(&entity("Post")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
        assert_eq!(a.entity_name(), "Blog");
        assert_eq!(b.entity_name(), "Post");
    }

    #[test]
    fn test_cache_hit_does_not_touch_rows() {
        let registry = TableRegistry::default();
        let blog = entity("Blog");
        registry
            .get_or_create(&blog)
            .unwrap()
            .insert(row([("id", Value::Int(1))]))
            .unwrap();
        assert_eq!(registry.get_or_create(&blog).unwrap().len(), 1);
    }

    #[test]
    fn test_keyless_entity_rejected() {
        let registry = TableRegistry::default();
        let keyless = EntityType::builder("Audit")
            .property("at", ScalarType::Int)
            .build()
            .unwrap();
        let err = registry.get_or_create(&keyless).unwrap_err();
        assert!(matches!(err, KeystoneError::Configuration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_float_key_rejected_without_table() {
        let registry = TableRegistry::default();
        let scored = EntityType::builder("Score")
            .property("value", ScalarType::Float)
            .key(["value"])
            .build()
            .unwrap();
        let err = registry.get_or_create(&scored).unwrap_err();
        assert!(matches!(err, KeystoneError::Configuration { .. }));
        assert!(registry.get(scored.primary_key().unwrap()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_without_create() {
        let registry = TableRegistry::default();
        let blog = entity("Blog");
        assert!(registry.get(blog.primary_key().unwrap()).is_none());
        registry.get_or_create(&blog).unwrap();
        assert!(registry.get(blog.primary_key().unwrap()).is_some());
    }

    #[test]
    fn test_sensitive_flag_threaded_into_tables() {
        let registry = TableRegistry::new(&LoggingOptions::with_sensitive_data_logging(true));
        assert!(registry.sensitive_logging_enabled());
        let table = registry.get_or_create(&entity("Blog")).unwrap();
        table.insert(row([("id", Value::Int(5))])).unwrap();
        let err = table.insert(row([("id", Value::Int(5))])).unwrap_err();
        assert!(err.to_string().contains("{5}"));
    }

    #[test]
    fn test_concurrent_first_requests_converge() {
        let registry = Arc::new(TableRegistry::default());
        let blog = Arc::new(entity("Blog"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let blog = Arc::clone(&blog);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_or_create(&blog).unwrap()
                })
            })
            .collect();

        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for t in &tables {
            assert!(Arc::ptr_eq(t, &tables[0]));
        }
        assert_eq!(registry.len(), 1);
    }
}
