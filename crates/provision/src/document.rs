//! Save executor that writes tracked entries as documents.
//!
//! Each entry becomes a JSON document in its entity type's container:
//! - every row value under its property name
//! - `id`: the entity type name followed by the primary key values, joined
//!   with `|`; `|` and `\` inside a part are escaped with `\`
//! - the partition key field (the partition key path without a leading `/`)
//!   set to the entity type name
//!
//! Rows may not carry a property named `id` or named like the partition key
//! field.
//!
//! Client failures while writing surface as
//! [`KeystoneError::SeedApplication`]; cancellation stays
//! [`KeystoneError::Cancelled`].

use crate::client::{AsyncDocumentClient, DocumentClient};
use async_trait::async_trait;
use keystone_core::config::ProvisioningOptions;
use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::tracking::{EntityState, TrackedEntry};
use keystone_core::traits::{AsyncSaveExecutor, SaveExecutor};
use keystone_core::value::{KeyValue, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A document write derived from one tracked entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    /// Create a new document
    Create {
        /// Target container
        container: String,
        /// Document body, `id` included
        document: serde_json::Value,
    },
    /// Replace an existing document
    Replace {
        /// Target container
        container: String,
        /// Document id
        id: String,
        /// Document body, `id` included
        document: serde_json::Value,
    },
    /// Delete a document
    Delete {
        /// Target container
        container: String,
        /// Document id
        id: String,
    },
}

/// Name of the document id field.
pub const ID_FIELD: &str = "id";

/// Build the document id from an entry's entity type and key values.
///
/// Entity types sharing a container never produce the same id, and distinct
/// keys of one entity type never collide.
pub fn document_id(entry: &TrackedEntry) -> KeystoneResult<String> {
    let entity_type = entry.entity_type();
    let descriptor = entity_type.primary_key().ok_or_else(|| {
        KeystoneError::configuration(format!(
            "entity type '{}' has no primary key; documents require an id",
            entity_type.name()
        ))
    })?;

    let mut parts = Vec::with_capacity(descriptor.properties().len() + 1);
    parts.push(escape_id_part(entity_type.name()));
    for property in descriptor.properties() {
        let value = entry.values().get(&property.name).unwrap_or(&Value::Null);
        let part = match KeyValue::from_value(value) {
            Some(KeyValue::String(s)) => s,
            Some(KeyValue::Int(i)) => i.to_string(),
            Some(KeyValue::Bool(b)) => b.to_string(),
            Some(KeyValue::Uuid(u)) => u.to_string(),
            Some(bytes @ KeyValue::Bytes(_)) => bytes.to_string(),
            None => {
                return Err(KeystoneError::invalid_value(
                    entity_type.name(),
                    &property.name,
                    "key property has no usable value",
                ))
            }
        };
        parts.push(escape_id_part(&part));
    }
    Ok(parts.join("|"))
}

fn escape_id_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if c == '|' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Document field that holds the partition value for `partition_key_path`.
pub fn partition_key_field(partition_key_path: &str) -> &str {
    partition_key_path.trim_start_matches('/')
}

/// Turn a tracked entry into the document write it implies.
///
/// Returns `None` for entries with nothing to save.
pub fn plan_write(
    entry: &TrackedEntry,
    partition_key_path: &str,
) -> KeystoneResult<Option<DocumentWrite>> {
    if !entry.state().is_pending() {
        return Ok(None);
    }

    let entity_type = entry.entity_type();
    let partition_field = partition_key_field(partition_key_path);
    if partition_field == ID_FIELD {
        return Err(KeystoneError::configuration(format!(
            "partition key path '{}' collides with the document id field",
            partition_key_path
        )));
    }
    for reserved in [ID_FIELD, partition_field] {
        if entity_type.find_property(reserved).is_some() {
            return Err(KeystoneError::configuration(format!(
                "entity type '{}' has a property named '{}', which is reserved for documents",
                entity_type.name(),
                reserved
            )));
        }
    }

    let container = entity_type.container_name().to_string();
    let id = document_id(entry)?;

    if entry.state() == EntityState::Deleted {
        return Ok(Some(DocumentWrite::Delete { container, id }));
    }

    entity_type.validate_row(entry.values())?;
    let mut document = serde_json::Map::new();
    for (name, value) in entry.values() {
        document.insert(name.clone(), value.to_json());
    }
    document.insert(
        partition_field.to_string(),
        serde_json::Value::String(entity_type.name().to_string()),
    );
    document.insert(ID_FIELD.to_string(), serde_json::Value::String(id.clone()));
    let document = serde_json::Value::Object(document);

    Ok(Some(match entry.state() {
        EntityState::Modified => DocumentWrite::Replace {
            container,
            id,
            document,
        },
        _ => DocumentWrite::Create {
            container,
            document,
        },
    }))
}

fn seed_failure(err: KeystoneError) -> KeystoneError {
    if matches!(
        err,
        KeystoneError::Cancelled | KeystoneError::SeedApplication { .. }
    ) {
        err
    } else {
        KeystoneError::seed(err.to_string())
    }
}

/// [`SaveExecutor`] writing through a document client.
#[derive(Debug)]
pub struct DocumentSaveExecutor<C> {
    client: Arc<C>,
    partition_key_path: String,
}

impl<C> DocumentSaveExecutor<C> {
    /// Create an executor writing through `client`.
    pub fn new(client: Arc<C>, options: &ProvisioningOptions) -> Self {
        Self {
            client,
            partition_key_path: options.partition_key_path.clone(),
        }
    }

    /// The client documents are written through.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    fn plan(&self, entries: &[TrackedEntry]) -> KeystoneResult<Vec<DocumentWrite>> {
        let mut writes = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(write) = plan_write(entry, &self.partition_key_path)? {
                writes.push(write);
            }
        }
        Ok(writes)
    }
}

impl<C: DocumentClient> SaveExecutor for DocumentSaveExecutor<C> {
    fn save_changes(&self, entries: &[TrackedEntry]) -> KeystoneResult<usize> {
        let writes = self.plan(entries)?;
        for write in &writes {
            let result = match write {
                DocumentWrite::Create {
                    container,
                    document,
                } => self.client.create_item(container, document.clone()),
                DocumentWrite::Replace {
                    container,
                    id,
                    document,
                } => self.client.replace_item(container, id, document.clone()),
                DocumentWrite::Delete { container, id } => {
                    self.client.delete_item(container, id).map(|_| ())
                }
            };
            result.map_err(seed_failure)?;
        }
        debug!(target: "keystone::provision", written = writes.len(), "documents saved");
        Ok(writes.len())
    }
}

#[async_trait]
impl<C: AsyncDocumentClient> AsyncSaveExecutor for DocumentSaveExecutor<C> {
    async fn save_changes_async(
        &self,
        entries: Vec<TrackedEntry>,
        cancel: &CancellationToken,
    ) -> KeystoneResult<usize> {
        if cancel.is_cancelled() {
            return Err(KeystoneError::Cancelled);
        }
        let writes = self.plan(&entries)?;
        for write in writes.iter().cloned() {
            let result = match write {
                DocumentWrite::Create {
                    container,
                    document,
                } => {
                    self.client
                        .create_item_async(&container, document, cancel)
                        .await
                }
                DocumentWrite::Replace {
                    container,
                    id,
                    document,
                } => {
                    self.client
                        .replace_item_async(&container, &id, document, cancel)
                        .await
                }
                DocumentWrite::Delete { container, id } => self
                    .client
                    .delete_item_async(&container, &id, cancel)
                    .await
                    .map(|_| ()),
            };
            result.map_err(seed_failure)?;
        }
        debug!(target: "keystone::provision", written = writes.len(), "documents saved");
        Ok(writes.len())
    }
}
