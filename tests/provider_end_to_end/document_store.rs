//! Document store provisioning through the facade.

use crate::common::{blog_model, init_tracing};
use keystone::{
    document_creator, CancellationToken, ClientOperation, KeystoneConfig, MemoryDocumentClient,
    Support,
};
use serde_json::json;
use std::sync::Arc;

/// Test: one container per distinct container name, seeded once
#[test]
fn test_provision_and_seed() {
    init_tracing();
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(Arc::clone(&client), blog_model(), &KeystoneConfig::default());

    assert!(creator.ensure_created().unwrap());
    assert_eq!(client.container_names(), vec!["Blogs", "Tags"]);
    assert_eq!(client.item_count("Blogs"), 3);
    assert_eq!(client.item_count("Tags"), 1);

    let tag = client.get_item("Tags", "Tag|1|rust").unwrap();
    assert_eq!(tag["__partitionKey"], json!("Tag"));

    assert!(!creator.ensure_created().unwrap());
    assert_eq!(client.item_count("Blogs"), 3);
}

/// Test: entity types sharing a container seed equal key values side by side
#[test]
fn test_shared_container_equal_keys() {
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(Arc::clone(&client), blog_model(), &KeystoneConfig::default());

    assert!(creator.ensure_created().unwrap());

    let blog = client.get_item("Blogs", "Blog|1").unwrap();
    let post = client.get_item("Blogs", "Post|1").unwrap();
    assert_eq!(blog["title"], json!("Systems"));
    assert_eq!(blog["__partitionKey"], json!("Blog"));
    assert_eq!(post["body"], json!("Hello"));
    assert_eq!(post["__partitionKey"], json!("Post"));
}

/// Test: partition key path from configuration reaches containers and documents
#[test]
fn test_configured_partition_key() {
    let config =
        KeystoneConfig::from_toml_str("[provisioning]\npartition_key_path = \"/tenant\"\n").unwrap();
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(Arc::clone(&client), blog_model(), &config);

    assert_eq!(creator.partition_key_path(), "/tenant");
    creator.ensure_created().unwrap();

    assert_eq!(client.partition_key_path("Blogs").as_deref(), Some("/tenant"));
    let blog = client.get_item("Blogs", "Blog|1").unwrap();
    assert_eq!(blog["tenant"], json!("Blog"));
}

/// Test: connectivity probing is reported as unsupported
#[tokio::test]
async fn test_can_connect_unsupported() {
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(client, blog_model(), &KeystoneConfig::default());

    assert!(!creator.can_connect().is_supported());
    let probe = creator.can_connect_async(&CancellationToken::new()).await;
    assert!(matches!(probe, Support::Unsupported { .. }));
}

/// Test: async provisioning matches the blocking path
#[tokio::test]
async fn test_async_provisioning() {
    init_tracing();
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(Arc::clone(&client), blog_model(), &KeystoneConfig::default());
    let cancel = CancellationToken::new();

    assert!(creator.ensure_created_async(&cancel).await.unwrap());
    assert!(!creator.ensure_created_async(&cancel).await.unwrap());
    assert_eq!(client.call_count(ClientOperation::WriteItem), 4);

    assert!(creator.ensure_deleted_async(&cancel).await.unwrap());
    assert!(!client.database_exists());
}

/// Test: a cancelled token stops provisioning before any client call
#[tokio::test]
async fn test_cancelled_before_start() {
    let client = Arc::new(MemoryDocumentClient::new("blogging"));
    let creator = document_creator(Arc::clone(&client), blog_model(), &KeystoneConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = creator.ensure_created_async(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!client.database_exists());
    assert_eq!(client.call_count(ClientOperation::CreateDatabase), 0);
}
