//! Upload events - discriminated union for all engine notifications.
//!
//! Events are fired from worker tasks and from whichever thread called a
//! manager method. Consumers must marshal them onto their own execution
//! context if they need one.

use serde::{Deserialize, Serialize};

use super::queue::ProgressTexts;
use super::types::ItemId;

/// Single discriminated union for all upload events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    /// Summary texts changed.
    ///
    /// Workers emit concurrently, so two of these can arrive out of order.
    /// Consumers that must show the latest lines read them back from the
    /// manager when this arrives.
    ProgressTexts {
        /// Pending summary line.
        pending: String,
        /// Completed summary line.
        completed: String,
    },

    /// Number of failed items changed.
    FailedCount {
        /// Items now in the failed set.
        count: usize,
    },

    /// A single item's transferred bytes, size, failed flag or text changed.
    ItemProgress {
        /// Item handle.
        id: ItemId,
        /// Bytes confirmed sent.
        transferred: u64,
        /// Total size in bytes.
        size: u64,
        /// Whether the item is in a failed state.
        failed: bool,
        /// Human-readable progress line.
        status: String,
    },

    /// A worker claimed the item and is starting its transfer.
    ItemStarted {
        /// Item handle.
        id: ItemId,
        /// Worker slot that owns the item.
        worker: usize,
    },

    /// The item was fully transferred.
    ItemCompleted {
        /// Item handle.
        id: ItemId,
    },

    /// The item moved to the failed set.
    ItemFailed {
        /// Item handle.
        id: ItemId,
        /// Reason reported by the mechanism or the caller.
        error: String,
    },

    /// The item was removed by the user.
    ItemCanceled {
        /// Item handle.
        id: ItemId,
    },

    /// Completed items exist that can be cleared.
    ClearableItems,

    /// Nothing pending and nothing in flight anymore.
    QueueDrained {
        /// Items completed since the manager was created.
        completed_total: u64,
        /// Items sitting in the failed set.
        failed: usize,
    },
}

impl UploadEvent {
    /// Create a progress-texts event.
    #[must_use]
    pub fn progress_texts(texts: ProgressTexts) -> Self {
        Self::ProgressTexts {
            pending: texts.pending,
            completed: texts.completed,
        }
    }

    /// Create an item-failed event.
    pub fn failed(id: ItemId, error: impl Into<String>) -> Self {
        Self::ItemFailed {
            id,
            error: error.into(),
        }
    }

    /// The item this event is about, if any.
    #[must_use]
    pub const fn item_id(&self) -> Option<ItemId> {
        match self {
            Self::ItemProgress { id, .. }
            | Self::ItemStarted { id, .. }
            | Self::ItemCompleted { id }
            | Self::ItemFailed { id, .. }
            | Self::ItemCanceled { id } => Some(*id),
            Self::ProgressTexts { .. }
            | Self::FailedCount { .. }
            | Self::ClearableItems
            | Self::QueueDrained { .. } => None,
        }
    }
}
