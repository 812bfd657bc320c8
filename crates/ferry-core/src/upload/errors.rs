//! Upload error types.
//!
//! These errors are serializable so they can cross into whatever
//! presentation layer consumes the engine. Mechanism failures are captured
//! as their human-readable text rather than as source errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ItemId;

/// Error type for upload engine operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadError {
    /// Item has no bytes to send.
    #[error("Empty item: {name}")]
    EmptyItem {
        /// Path or name of the rejected item.
        name: String,
    },

    /// Item is larger than the configured ceiling.
    #[error("Item too large: {name} is {size} bytes (max {max})")]
    TooLarge {
        /// Path or name of the rejected item.
        name: String,
        /// Size of the rejected item.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Pending queue reached its configured cap.
    #[error("Queue full: maximum {max} pending items allowed")]
    QueueFull {
        /// Configured pending cap.
        max: usize,
    },

    /// The transfer mechanism could not begin the upload.
    #[error("Start failed: {message}")]
    StartFailed {
        /// Error text reported by the mechanism.
        message: String,
    },

    /// The transfer mechanism failed mid-transfer.
    #[error("Chunk failed: {message}")]
    ChunkFailed {
        /// Error text reported by the mechanism.
        message: String,
    },

    /// Upload was canceled by the user.
    #[error("Upload canceled")]
    Canceled,

    /// No item with this handle is known to the manager.
    #[error("Not found: {id}")]
    NotFound {
        /// The handle that wasn't found.
        id: ItemId,
    },

    /// The manager has been shut down and accepts no new work.
    #[error("Upload manager is shutting down")]
    ShuttingDown,
}

impl UploadError {
    /// Create an empty-item rejection.
    pub fn empty_item(name: impl Into<String>) -> Self {
        Self::EmptyItem { name: name.into() }
    }

    /// Create a too-large rejection.
    pub fn too_large(name: impl Into<String>, size: u64, max: u64) -> Self {
        Self::TooLarge {
            name: name.into(),
            size,
            max,
        }
    }

    /// Create a queue-full rejection.
    #[must_use]
    pub const fn queue_full(max: usize) -> Self {
        Self::QueueFull { max }
    }

    /// Create a start failure.
    pub fn start_failed(message: impl Into<String>) -> Self {
        Self::StartFailed {
            message: message.into(),
        }
    }

    /// Create a chunk failure.
    pub fn chunk_failed(message: impl Into<String>) -> Self {
        Self::ChunkFailed {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub const fn not_found(id: ItemId) -> Self {
        Self::NotFound { id }
    }

    /// Whether the item was rejected before it ever entered the queue.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyItem { .. } | Self::TooLarge { .. } | Self::QueueFull { .. }
        )
    }

    /// Whether this error sends the item to the failed set.
    #[must_use]
    pub const fn is_transfer_failure(&self) -> bool {
        matches!(self, Self::StartFailed { .. } | Self::ChunkFailed { .. })
    }

    /// Text suitable for an item's progress line or a dialog.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyItem { name } => format!("Skipping {name} because it is empty."),
            Self::TooLarge { name, size, max } => {
                // +0.01 keeps the rounded size strictly above the ceiling
                let size_mb = *size as f64 / 1024.0 / 1024.0 + 0.01;
                let max_mb = *max as f64 / 1024.0 / 1024.0;
                format!(
                    "Skipping {name} because it is too big ({size_mb:.2}MB, max allowed {max_mb:.2}MB)."
                )
            }
            Self::QueueFull { max } => {
                format!("Upload queue is full (max {max} items). Wait for uploads to finish.")
            }
            Self::StartFailed { message } | Self::ChunkFailed { message } => message.clone(),
            Self::Canceled => "canceled by user".to_string(),
            Self::NotFound { id } => format!("Item {id} is not in the upload queue."),
            Self::ShuttingDown => "Uploading has been shut down.".to_string(),
        }
    }
}

/// Convenience result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(UploadError::empty_item("a").is_validation());
        assert!(UploadError::too_large("a", 20, 10).is_validation());
        assert!(UploadError::queue_full(3).is_validation());
        assert!(!UploadError::start_failed("boom").is_validation());
        assert!(!UploadError::Canceled.is_validation());
    }

    #[test]
    fn test_transfer_failure_classification() {
        assert!(UploadError::start_failed("x").is_transfer_failure());
        assert!(UploadError::chunk_failed("x").is_transfer_failure());
        assert!(!UploadError::Canceled.is_transfer_failure());
    }

    #[test]
    fn test_too_large_message_never_rounds_down_to_limit() {
        let max = 16 * 1024 * 1024;
        let err = UploadError::too_large("big.png", max + 1, max);
        let msg = err.user_message();
        assert!(msg.contains("16.01MB"), "{msg}");
        assert!(msg.contains("max allowed 16.00MB"), "{msg}");
    }

    #[test]
    fn test_mechanism_text_passes_through() {
        let err = UploadError::chunk_failed("connection reset");
        assert_eq!(err.user_message(), "connection reset");
        assert_eq!(err.to_string(), "Chunk failed: connection reset");
    }

    #[test]
    fn test_error_serialization() {
        let err = UploadError::not_found(ItemId::new(9));
        let json = serde_json::to_string(&err).unwrap();
        let parsed: UploadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }
}
