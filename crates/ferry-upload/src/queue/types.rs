//! Queue item types (internal implementation).
//!
//! For API responses, convert to the DTOs in `ferry_core::upload`.

use ferry_core::{ItemId, ItemStatus, ItemSummary};

use crate::progress::RateEstimator;
use crate::progress::summary::NOT_YET_UPLOADED;

/// An item owned by exactly one of the queue's collections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadItem {
    /// Item handle.
    pub id: ItemId,
    /// Path or display name handed to the mechanism.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Bytes confirmed sent.
    pub transferred: u64,
    /// Whether the last attempt failed.
    pub failed: bool,
    /// Human-readable progress line.
    pub status_text: String,
}

impl UploadItem {
    pub fn new(id: ItemId, name: impl Into<String>, size: u64) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            transferred: 0,
            failed: false,
            status_text: NOT_YET_UPLOADED.to_string(),
        }
    }

    /// Bytes not yet sent.
    pub const fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.transferred)
    }

    /// Convert to a core DTO.
    pub fn to_summary(&self, status: ItemStatus, worker: Option<usize>) -> ItemSummary {
        ItemSummary {
            id: self.id,
            name: self.name.clone(),
            size: self.size,
            transferred: self.transferred,
            failed: self.failed,
            status,
            status_text: self.status_text.clone(),
            worker,
        }
    }
}

/// One worker's share of the queue state.
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    /// Item this worker owns, if any.
    pub current: Option<UploadItem>,
    /// Throughput of this worker.
    pub rate: RateEstimator,
}

impl WorkerSlot {
    pub const fn new(rate_smoothing: f64) -> Self {
        Self {
            current: None,
            rate: RateEstimator::new(rate_smoothing),
        }
    }

    /// Whether this slot currently owns `id`.
    pub fn owns(&self, id: ItemId) -> bool {
        self.current.as_ref().is_some_and(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_defaults() {
        let item = UploadItem::new(ItemId::new(1), "a.jpg", 10_000);
        assert_eq!(item.transferred, 0);
        assert!(!item.failed);
        assert_eq!(item.status_text, "not yet uploaded");
        assert_eq!(item.remaining(), 10_000);
    }

    #[test]
    fn test_to_summary() {
        let mut item = UploadItem::new(ItemId::new(2), "b.jpg", 100);
        item.transferred = 40;
        let summary = item.to_summary(ItemStatus::Uploading, Some(1));
        assert_eq!(summary.id, ItemId::new(2));
        assert_eq!(summary.transferred, 40);
        assert_eq!(summary.worker, Some(1));
        assert_eq!(summary.status, ItemStatus::Uploading);
    }

    #[test]
    fn test_slot_owns() {
        let mut slot = WorkerSlot::new(0.5);
        assert!(!slot.owns(ItemId::new(1)));
        slot.current = Some(UploadItem::new(ItemId::new(1), "a", 1));
        assert!(slot.owns(ItemId::new(1)));
        assert!(!slot.owns(ItemId::new(2)));
    }
}
