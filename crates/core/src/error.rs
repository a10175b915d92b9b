//! Error types shared by every Keystone crate.
//!
//! Collaborator failures (document client, save executor) are surfaced as-is;
//! nothing in the provider layer retries or reclassifies them.

use thiserror::Error;

/// Result alias used across Keystone.
pub type KeystoneResult<T> = std::result::Result<T, KeystoneError>;

/// Placeholder rendered in place of key values when sensitive data logging is off.
pub const REDACTED: &str = "{redacted}";

/// Errors raised by the provider layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeystoneError {
    /// Model or configuration cannot be used as declared
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// The document client reported a failure
    #[error("remote provisioning failed during {operation}: {reason}")]
    RemoteProvisioning {
        /// Client operation that failed
        operation: String,
        /// Client-supplied reason
        reason: String,
    },

    /// Applying staged entries failed
    #[error("failed to apply seed data: {reason}")]
    SeedApplication {
        /// Executor-supplied reason
        reason: String,
    },

    /// Capability deliberately not provided
    #[error("operation '{operation}' is not supported by this provider")]
    Unsupported {
        /// Name of the unsupported operation
        operation: String,
    },

    /// The cancellation token fired before the operation completed
    #[error("operation was cancelled")]
    Cancelled,

    /// An insert collided with an existing row
    #[error("cannot add '{entity}' row: key {key} is already present")]
    DuplicateKey {
        /// Entity type name
        entity: String,
        /// Rendered key, or the redaction placeholder
        key: String,
    },

    /// An update or delete targeted a row that does not exist
    #[error("'{entity}' row with key {key} does not exist in the store")]
    RowNotFound {
        /// Entity type name
        entity: String,
        /// Rendered key, or the redaction placeholder
        key: String,
    },

    /// A value does not match the declared property type
    #[error("invalid value for '{entity}.{property}': {reason}")]
    InvalidValue {
        /// Entity type name
        entity: String,
        /// Property name
        property: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Document or configuration (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl KeystoneError {
    /// Build a [`KeystoneError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        KeystoneError::Configuration {
            message: message.into(),
        }
    }

    /// Build a [`KeystoneError::RemoteProvisioning`].
    pub fn remote(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        KeystoneError::RemoteProvisioning {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`KeystoneError::SeedApplication`].
    pub fn seed(reason: impl Into<String>) -> Self {
        KeystoneError::SeedApplication {
            reason: reason.into(),
        }
    }

    /// Build a [`KeystoneError::Unsupported`].
    pub fn unsupported(operation: impl Into<String>) -> Self {
        KeystoneError::Unsupported {
            operation: operation.into(),
        }
    }

    /// Build a [`KeystoneError::InvalidValue`].
    pub fn invalid_value(
        entity: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        KeystoneError::InvalidValue {
            entity: entity.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`KeystoneError::Serialization`].
    pub fn serialization(message: impl Into<String>) -> Self {
        KeystoneError::Serialization(message.into())
    }

    /// True for [`KeystoneError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KeystoneError::Cancelled)
    }
}

impl From<serde_json::Error> for KeystoneError {
    fn from(e: serde_json::Error) -> Self {
        KeystoneError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for KeystoneError {
    fn from(e: toml::de::Error) -> Self {
        KeystoneError::Configuration {
            message: e.to_string(),
        }
    }
}
