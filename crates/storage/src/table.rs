//! In-memory tables.
//!
//! A table holds the rows of one entity type keyed by principal key. The key
//! factory is fixed at construction; so is the sensitive-logging flag that
//! decides whether diagnostics carry real key values.
//!
//! # Thread Safety
//!
//! [`MemoryTable`] guards its rows with a `parking_lot::RwLock`. Readers share
//! the lock; writers hold it only for the single map operation.

use crate::key_factory::KeyValueFactory;
use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::metadata::KeyDescriptor;
use keystone_core::value::{PrincipalKey, Row, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Row storage for one entity type.
pub trait InMemoryTable: Send + Sync + fmt::Debug {
    /// Name of the entity type stored here.
    fn entity_name(&self) -> &str;

    /// Key descriptor that identifies this table.
    fn key_descriptor(&self) -> &KeyDescriptor;

    /// Add a new row. Fails with [`KeystoneError::DuplicateKey`] if the key is taken.
    fn insert(&self, row: Row) -> KeystoneResult<()>;

    /// Insert or fully replace the row under its key. Returns `true` if a row was replaced.
    fn upsert(&self, row: Row) -> KeystoneResult<bool>;

    /// Replace an existing row. Fails with [`KeystoneError::RowNotFound`] if absent.
    fn update(&self, row: Row) -> KeystoneResult<()>;

    /// Remove the row with these key values. Absent rows are not an error.
    fn remove(&self, key_values: &[Value]) -> KeystoneResult<bool>;

    /// Look up a row by key values.
    fn find(&self, key_values: &[Value]) -> KeystoneResult<Option<Row>>;

    /// Snapshot of the current rows.
    fn rows(&self) -> TableRows;

    /// Number of rows.
    fn len(&self) -> usize;

    /// Check if the table has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every row.
    fn clear(&self);
}

/// Rows captured at the moment [`InMemoryTable::rows`] was called.
///
/// Iteration can be repeated and is unaffected by later writes to the table.
/// Rows are ordered by principal key.
#[derive(Debug, Clone)]
pub struct TableRows {
    rows: Arc<[Row]>,
}

impl TableRows {
    /// Iterate over the captured rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Number of captured rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows were captured.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> IntoIterator for &'a TableRows {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Hash-map backed [`InMemoryTable`].
pub struct MemoryTable {
    key_factory: Arc<dyn KeyValueFactory>,
    sensitive_logging: bool,
    rows: RwLock<FxHashMap<PrincipalKey, Row>>,
}

impl MemoryTable {
    /// Create an empty table bound to `key_factory`.
    pub fn new(key_factory: Arc<dyn KeyValueFactory>, sensitive_logging: bool) -> Self {
        Self {
            key_factory,
            sensitive_logging,
            rows: RwLock::new(FxHashMap::default()),
        }
    }

    /// Whether diagnostics render real key values.
    pub fn sensitive_logging_enabled(&self) -> bool {
        self.sensitive_logging
    }

    fn render(&self, key: &PrincipalKey) -> String {
        key.render(self.sensitive_logging)
    }
}

impl InMemoryTable for MemoryTable {
    fn entity_name(&self) -> &str {
        self.key_factory.descriptor().entity()
    }

    fn key_descriptor(&self) -> &KeyDescriptor {
        self.key_factory.descriptor()
    }

    fn insert(&self, row: Row) -> KeystoneResult<()> {
        let key = self.key_factory.key_from_row(&row)?;
        let mut rows = self.rows.write();
        match rows.entry(key) {
            Entry::Occupied(occupied) => Err(KeystoneError::DuplicateKey {
                entity: self.entity_name().to_string(),
                key: self.render(occupied.key()),
            }),
            Entry::Vacant(vacant) => {
                trace!(
                    target: "keystone::storage",
                    entity = self.entity_name(),
                    key = %self.render(vacant.key()),
                    "row inserted"
                );
                vacant.insert(row);
                Ok(())
            }
        }
    }

    fn upsert(&self, row: Row) -> KeystoneResult<bool> {
        let key = self.key_factory.key_from_row(&row)?;
        trace!(
            target: "keystone::storage",
            entity = self.entity_name(),
            key = %self.render(&key),
            "row upserted"
        );
        Ok(self.rows.write().insert(key, row).is_some())
    }

    fn update(&self, row: Row) -> KeystoneResult<()> {
        let key = self.key_factory.key_from_row(&row)?;
        let mut rows = self.rows.write();
        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(KeystoneError::RowNotFound {
                entity: self.entity_name().to_string(),
                key: self.render(&key),
            }),
        }
    }

    fn remove(&self, key_values: &[Value]) -> KeystoneResult<bool> {
        let key = self.key_factory.key_from_values(key_values)?;
        Ok(self.rows.write().remove(&key).is_some())
    }

    fn find(&self, key_values: &[Value]) -> KeystoneResult<Option<Row>> {
        let key = self.key_factory.key_from_values(key_values)?;
        Ok(self.rows.read().get(&key).cloned())
    }

    fn rows(&self) -> TableRows {
        let mut snapshot: Vec<(PrincipalKey, Row)> = self
            .rows
            .read()
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        TableRows {
            rows: snapshot.into_iter().map(|(_, r)| r).collect(),
        }
    }

    fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn clear(&self) {
        self.rows.write().clear();
    }
}

impl fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTable")
            .field("entity", &self.entity_name())
            .field("rows", &self.len())
            .field("sensitive_logging", &self.sensitive_logging)
            .finish()
    }
}
