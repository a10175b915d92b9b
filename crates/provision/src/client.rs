//! Document store client contracts.
//!
//! The provisioning workflow talks to the remote store only through these
//! traits. Implementations own transport, retries and deadlines; callers see
//! their errors unchanged.

use async_trait::async_trait;
use keystone_core::error::KeystoneResult;
use tokio_util::sync::CancellationToken;

/// Blocking client for a document database.
pub trait DocumentClient: Send + Sync {
    /// Create the database if absent. Returns `true` if it was created.
    fn create_database_if_not_exists(&self) -> KeystoneResult<bool>;

    /// Create a container if absent. Returns `true` if it was created.
    fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key_path: &str,
    ) -> KeystoneResult<bool>;

    /// Delete the database. Returns `true` if it existed.
    fn delete_database(&self) -> KeystoneResult<bool>;

    /// Write a new document.
    fn create_item(&self, container: &str, document: serde_json::Value) -> KeystoneResult<()>;

    /// Replace the document with the given id.
    fn replace_item(
        &self,
        container: &str,
        id: &str,
        document: serde_json::Value,
    ) -> KeystoneResult<()>;

    /// Delete the document with the given id. Returns `true` if it existed.
    fn delete_item(&self, container: &str, id: &str) -> KeystoneResult<bool>;
}

/// Non-blocking client for a document database.
///
/// Every call takes a cancellation token; implementations return
/// `KeystoneError::Cancelled` once it has fired.
#[async_trait]
pub trait AsyncDocumentClient: Send + Sync {
    /// Create the database if absent. Returns `true` if it was created.
    async fn create_database_if_not_exists_async(
        &self,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool>;

    /// Create a container if absent. Returns `true` if it was created.
    async fn create_container_if_not_exists_async(
        &self,
        container: &str,
        partition_key_path: &str,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool>;

    /// Delete the database. Returns `true` if it existed.
    async fn delete_database_async(&self, cancel: &CancellationToken) -> KeystoneResult<bool>;

    /// Write a new document.
    async fn create_item_async(
        &self,
        container: &str,
        document: serde_json::Value,
        cancel: &CancellationToken,
    ) -> KeystoneResult<()>;

    /// Replace the document with the given id.
    async fn replace_item_async(
        &self,
        container: &str,
        id: &str,
        document: serde_json::Value,
        cancel: &CancellationToken,
    ) -> KeystoneResult<()>;

    /// Delete the document with the given id. Returns `true` if it existed.
    async fn delete_item_async(
        &self,
        container: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> KeystoneResult<bool>;
}
