//! Contracts between the provisioning workflow and the stores it drives.

use crate::error::{KeystoneError, KeystoneResult};
use crate::tracking::TrackedEntry;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Applies staged entries to a backing store.
pub trait SaveExecutor: Send + Sync {
    /// Apply `entries` and return how many were written.
    fn save_changes(&self, entries: &[TrackedEntry]) -> KeystoneResult<usize>;
}

/// Non-blocking counterpart of [`SaveExecutor`].
#[async_trait]
pub trait AsyncSaveExecutor: Send + Sync {
    /// Apply `entries` and return how many were written.
    ///
    /// Implementations check `cancel` before writing and return
    /// [`KeystoneError::Cancelled`] once it has fired.
    async fn save_changes_async(
        &self,
        entries: Vec<TrackedEntry>,
        cancel: &CancellationToken,
    ) -> KeystoneResult<usize>;
}

/// Outcome of a capability that a provider may not offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support<T> {
    /// The provider performed the operation
    Supported(T),
    /// The provider does not offer this operation
    Unsupported {
        /// Operation name
        operation: &'static str,
    },
}

impl<T> Support<T> {
    /// Check for [`Support::Supported`].
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Supported(_))
    }

    /// Convert into a result, mapping `Unsupported` to [`KeystoneError::Unsupported`].
    pub fn into_result(self) -> KeystoneResult<T> {
        match self {
            Support::Supported(v) => Ok(v),
            Support::Unsupported { operation } => Err(KeystoneError::unsupported(operation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_into_result() {
        assert_eq!(Support::Supported(true).into_result(), Ok(true));

        let unsupported: Support<bool> = Support::Unsupported {
            operation: "can_connect",
        };
        assert!(!unsupported.is_supported());
        assert_eq!(
            unsupported.into_result(),
            Err(KeystoneError::unsupported("can_connect"))
        );
    }
}
