//! Provisioning layer for Keystone
//!
//! This crate drives a remote document store:
//! - Client contracts: blocking and async document clients
//! - MemoryDocumentClient: in-process document database
//! - DocumentSaveExecutor: writes tracked entries as JSON documents
//! - DatabaseCreator: ensure database and containers exist, seed on creation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod creator;
pub mod document;
pub mod memory_client;

pub use client::{AsyncDocumentClient, DocumentClient};
pub use creator::{DatabaseCreator, ProvisioningStage};
pub use document::{
    document_id, partition_key_field, plan_write, DocumentSaveExecutor, DocumentWrite, ID_FIELD,
};
pub use memory_client::{ClientOperation, MemoryDocumentClient};
