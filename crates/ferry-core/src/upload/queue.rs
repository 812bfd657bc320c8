//! Queue snapshot DTOs.

use serde::{Deserialize, Serialize};

use super::types::{ItemStatus, ItemSummary};

/// Aggregate counters read from a single consistent view of the queue.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Items pending plus items owned by a worker.
    pub items_left: usize,
    /// Items currently owned by a worker.
    pub in_flight: usize,
    /// Bytes still to send across pending and owned items.
    pub bytes_remaining: u64,
    /// Items sitting in the failed set.
    pub failed: usize,
    /// Items sitting in the completed set (not yet cleared).
    pub completed: usize,
    /// Items completed since the manager was created (survives clears).
    pub items_completed_total: u64,
    /// Sum of the fresh per-worker rate estimates, bytes per second.
    pub rate_bps: f64,
    /// Whether uploading is currently enabled.
    pub enabled: bool,
}

impl QueueStats {
    /// Nothing pending and nothing in flight.
    #[must_use]
    pub const fn is_drained(&self) -> bool {
        self.items_left == 0
    }
}

/// Every item the manager knows about, in display order:
/// owned items, then pending (queue order), then failed, then completed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Items in display order.
    pub items: Vec<ItemSummary>,
    /// Aggregate counters taken in the same critical section.
    pub stats: QueueStats,
}

impl QueueSnapshot {
    /// Items with the given status.
    pub fn with_status(&self, status: ItemStatus) -> impl Iterator<Item = &ItemSummary> {
        self.items.iter().filter(move |item| item.status == status)
    }
}

/// The two summary lines a presentation layer shows above the item list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTexts {
    /// "3 items left (1.25 MB).  About 2 minutes remaining at 80 kb/s"
    pub pending: String,
    /// "1 item has been uploaded.  2 items failed to upload."
    pub completed: String,
}
