//! Provider configuration.
//!
//! Loaded from TOML; every field has a default so an empty document is valid.
//!
//! ```toml
//! [logging]
//! sensitive_data_logging = true
//!
//! [provisioning]
//! partition_key_path = "/tenant"
//! ```

use crate::error::{KeystoneError, KeystoneResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default partition key path for document containers.
pub const DEFAULT_PARTITION_KEY_PATH: &str = "__partitionKey";

/// Diagnostic options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Render key values in errors and trace events. Off by default.
    pub sensitive_data_logging: bool,
}

impl LoggingOptions {
    /// Options with sensitive data logging switched on or off.
    pub fn with_sensitive_data_logging(enabled: bool) -> Self {
        Self {
            sensitive_data_logging: enabled,
        }
    }
}

/// Options for provisioning document stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningOptions {
    /// Partition key path used when creating containers
    pub partition_key_path: String,
}

impl Default for ProvisioningOptions {
    fn default() -> Self {
        Self {
            partition_key_path: DEFAULT_PARTITION_KEY_PATH.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    /// Diagnostic options
    pub logging: LoggingOptions,
    /// Provisioning options
    pub provisioning: ProvisioningOptions,
}

impl KeystoneConfig {
    /// Parse configuration from a TOML document.
    pub fn from_toml_str(input: &str) -> KeystoneResult<Self> {
        let config: KeystoneConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> KeystoneResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            KeystoneError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&input)
    }

    fn validate(&self) -> KeystoneResult<()> {
        if self.provisioning.partition_key_path.trim().is_empty() {
            return Err(KeystoneError::configuration(
                "provisioning.partition_key_path must not be empty",
            ));
        }
        Ok(())
    }
}
