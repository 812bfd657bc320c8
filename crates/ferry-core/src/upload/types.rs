//! Core domain types for uploads.
//!
//! Pure data types with no I/O dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for an item accepted by the upload manager.
///
/// Handles are assigned in increasing order and never reused within a
/// manager's lifetime, so a stale handle simply stops matching anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an item currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting in the pending queue.
    Queued,
    /// Owned by a worker and being transferred.
    Uploading,
    /// Fully transferred, waiting to be cleared.
    Completed,
    /// Failed; sits in the failed set until retried or removed.
    Failed,
}

impl ItemStatus {
    /// Stable string form for logs and serialized snapshots.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a single item, safe to hand to a presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Item handle.
    pub id: ItemId,
    /// Path or display name the item was added with.
    pub name: String,
    /// Total size in bytes (may have been corrected once the transfer started).
    pub size: u64,
    /// Bytes confirmed sent so far.
    pub transferred: u64,
    /// Whether the last attempt failed.
    pub failed: bool,
    /// Which collection currently owns the item.
    pub status: ItemStatus,
    /// Human-readable progress line ("42.00% uploaded", an error, ...).
    pub status_text: String,
    /// Worker slot holding the item while it is uploading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<usize>,
}

impl ItemSummary {
    /// Fraction transferred in `[0.0, 1.0]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.transferred as f64 / self.size as f64
        }
    }

    /// Bytes still to send.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.transferred)
    }
}
