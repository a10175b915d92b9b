//! In-process document client.
//!
//! Keeps one database of containers in memory and implements both client
//! traits over it. Useful as a local stand-in for the remote store and for
//! exercising failure paths: [`MemoryDocumentClient::fail_after`] makes a
//! chosen operation fail once after a number of successful calls.

use crate::client::{AsyncDocumentClient, DocumentClient};
use async_trait::async_trait;
use dashmap::DashMap;
use keystone_core::error::{KeystoneError, KeystoneResult};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Client operations, used for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOperation {
    /// `create_database_if_not_exists`
    CreateDatabase,
    /// `create_container_if_not_exists`
    CreateContainer,
    /// `delete_database`
    DeleteDatabase,
    /// `create_item`, `replace_item` or `delete_item`
    WriteItem,
}

impl ClientOperation {
    fn name(self) -> &'static str {
        match self {
            ClientOperation::CreateDatabase => "create_database",
            ClientOperation::CreateContainer => "create_container",
            ClientOperation::DeleteDatabase => "delete_database",
            ClientOperation::WriteItem => "write_item",
        }
    }
}

#[derive(Debug)]
struct Fault {
    operation: ClientOperation,
    successes_left: usize,
    reason: String,
}

#[derive(Debug)]
struct MemoryContainer {
    partition_key_path: String,
    items: DashMap<String, serde_json::Value>,
}

type Containers = Arc<DashMap<String, MemoryContainer>>;

/// Document database held in process memory.
#[derive(Debug)]
pub struct MemoryDocumentClient {
    database_name: String,
    containers: RwLock<Option<Containers>>,
    calls: DashMap<ClientOperation, usize>,
    fault: Mutex<Option<Fault>>,
}

impl MemoryDocumentClient {
    /// Create a client for a database that does not exist yet.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            containers: RwLock::new(None),
            calls: DashMap::new(),
            fault: Mutex::new(None),
        }
    }

    /// Name of the database this client manages.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Make the call of `operation` after `successes` successful ones fail once.
    pub fn fail_after(&self, operation: ClientOperation, successes: usize, reason: impl Into<String>) {
        *self.fault.lock() = Some(Fault {
            operation,
            successes_left: successes,
            reason: reason.into(),
        });
    }

    /// Make the next call of `operation` fail once.
    pub fn fail_on(&self, operation: ClientOperation, reason: impl Into<String>) {
        self.fail_after(operation, 0, reason);
    }

    /// How many times `operation` has been called, failures included.
    pub fn call_count(&self, operation: ClientOperation) -> usize {
        self.calls.get(&operation).map(|c| *c).unwrap_or(0)
    }

    /// Check if the database exists.
    pub fn database_exists(&self) -> bool {
        self.containers.read().is_some()
    }

    /// Names of existing containers, sorted.
    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.containers.read().as_ref() {
            Some(containers) => containers.iter().map(|c| c.key().clone()).collect(),
            None => Vec::new(),
        };
        names.sort();
        names
    }

    /// Partition key path a container was created with.
    pub fn partition_key_path(&self, container: &str) -> Option<String> {
        self.containers
            .read()
            .as_ref()
            .and_then(|cs| cs.get(container).map(|c| c.partition_key_path.clone()))
    }

    /// Number of documents in a container (0 if it does not exist).
    pub fn item_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .as_ref()
            .and_then(|cs| cs.get(container).map(|c| c.items.len()))
            .unwrap_or(0)
    }

    /// Fetch a document by id.
    pub fn get_item(&self, container: &str, id: &str) -> Option<serde_json::Value> {
        self.containers
            .read()
            .as_ref()
            .and_then(|cs| cs.get(container).and_then(|c| c.items.get(id).map(|d| d.clone())))
    }

    fn enter(&self, operation: ClientOperation) -> KeystoneResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;

        let mut fault = self.fault.lock();
        if let Some(f) = fault.as_mut() {
            if f.operation == operation {
                if f.successes_left == 0 {
                    let reason = std::mem::take(&mut f.reason);
                    *fault = None;
                    return Err(KeystoneError::remote(operation.name(), reason));
                }
                f.successes_left -= 1;
            }
        }
        Ok(())
    }

    fn existing_containers(&self, operation: ClientOperation) -> KeystoneResult<Containers> {
        self.containers.read().clone().ok_or_else(|| {
            KeystoneError::remote(
                operation.name(),
                format!("database '{}' does not exist", self.database_name),
            )
        })
    }

    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&MemoryContainer) -> KeystoneResult<T>,
    ) -> KeystoneResult<T> {
        let containers = self.existing_containers(ClientOperation::WriteItem)?;
        let entry = containers.get(container).ok_or_else(|| {
            KeystoneError::remote(
                ClientOperation::WriteItem.name(),
                format!("container '{}' does not exist", container),
            )
        })?;
        f(entry.value())
    }
}

fn document_id(document: &serde_json::Value) -> KeystoneResult<String> {
    document
        .get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            KeystoneError::remote(
                ClientOperation::WriteItem.name(),
                "document has no string 'id' field",
            )
        })
}

fn check_cancelled(cancel: &CancellationToken) -> KeystoneResult<()> {
    if cancel.is_cancelled() {
        return Err(KeystoneError::Cancelled);
    }
    Ok(())
}

impl DocumentClient for MemoryDocumentClient {
    fn create_database_if_not_exists(&self) -> KeystoneResult<bool> {
        self.enter(ClientOperation::CreateDatabase)?;
        let mut containers = self.containers.write();
        if containers.is_some() {
            return Ok(false);
        }
        *containers = Some(Arc::new(DashMap::new()));
        debug!(target: "keystone::provision", database = %self.database_name, "database created");
        Ok(true)
    }

    fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key_path: &str,
    ) -> KeystoneResult<bool> {
        self.enter(ClientOperation::CreateContainer)?;
        let containers = self.existing_containers(ClientOperation::CreateContainer)?;
        if containers.contains_key(container) {
            return Ok(false);
        }
        let created = match containers.entry(container.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(MemoryContainer {
                    partition_key_path: partition_key_path.to_string(),
                    items: DashMap::new(),
                });
                true
            }
        };
        if created {
            debug!(target: "keystone::provision", container, partition_key_path, "container created");
        }
        Ok(created)
    }

    fn delete_database(&self) -> KeystoneResult<bool> {
        self.enter(ClientOperation::DeleteDatabase)?;
        Ok(self.containers.write().take().is_some())
    }

    fn create_item(&self, container: &str, document: serde_json::Value) -> KeystoneResult<()> {
        self.enter(ClientOperation::WriteItem)?;
        let id = document_id(&document)?;
        self.with_container(container, |c| {
            match c.items.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => Err(KeystoneError::remote(
                    ClientOperation::WriteItem.name(),
                    format!("document '{}' already exists in '{}'", id, container),
                )),
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    vacant.insert(document);
                    Ok(())
                }
            }
        })
    }

    fn replace_item(
        &self,
        container: &str,
        id: &str,
        document: serde_json::Value,
    ) -> KeystoneResult<()> {
        self.enter(ClientOperation::WriteItem)?;
        self.with_container(container, |c| match c.items.get_mut(id) {
            Some(mut existing) => {
                *existing = document;
                Ok(())
            }
            None => Err(KeystoneError::remote(
                ClientOperation::WriteItem.name(),
                format!("document '{}' does not exist in '{}'", id, container),
            )),
        })
    }

    fn delete_item(&self, container: &str, id: &str) -> KeystoneResult<bool> {
        self.enter(ClientOperation::WriteItem)?;
        self.with_container(container, |c| Ok(c.items.remove(id).is_some()))
    }
}

#[async_trait]
impl AsyncDocumentClient for MemoryDocumentClient {
    async fn create_database_if_not_exists_async(
        &self,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.create_database_if_not_exists()
    }

    async fn create_container_if_not_exists_async(
        &self,
        container: &str,
        partition_key_path: &str,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.create_container_if_not_exists(container, partition_key_path)
    }

    async fn delete_database_async(&self, cancel: &CancellationToken) -> KeystoneResult<bool> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.delete_database()
    }

    async fn create_item_async(
        &self,
        container: &str,
        document: serde_json::Value,
        cancel: &CancellationToken,
    ) -> KeystoneResult<()> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.create_item(container, document)
    }

    async fn replace_item_async(
        &self,
        container: &str,
        id: &str,
        document: serde_json::Value,
        cancel: &CancellationToken,
    ) -> KeystoneResult<()> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.replace_item(container, id, document)
    }

    async fn delete_item_async(
        &self,
        container: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool> {
        check_cancelled(cancel)?;
        tokio::task::yield_now().await;
        self.delete_item(container, id)
    }
}
