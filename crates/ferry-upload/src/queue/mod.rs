//! Upload queue state.
//!
//! This module provides a pure state machine for the upload queue: the
//! pending FIFO, one slot per worker, the failed set and the completed set.
//! No I/O is performed here; `UploadManager` wraps it in a lock and handles
//! waking workers and emitting events.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Every item lives in exactly one collection; moving it is the only
//!   way its state changes
//! - `bytes_remaining` always equals the unsent bytes of pending and owned
//!   items; every operation that touches `size` or `transferred` adjusts it
//!   in the same call
//! - Time is passed in (`now`) so rate bookkeeping stays deterministic
//!
//! # Cancellation
//!
//! Canceling an owned item clears the worker's slot immediately and removes
//! the item's whole unsent remainder from `bytes_remaining`. The worker
//! notices at its next chunk boundary. Chunk results reported for an item
//! the slot no longer owns are dropped without touching the counters.

mod types;

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use ferry_core::{
    ItemId, ItemStatus, QueueSnapshot, QueueStats, UploadError, UploadManagerConfig, UploadResult,
};

use crate::progress::item_progress_text;
use crate::progress::summary::{FINALIZING, NOT_YET_UPLOADED, UPLOADED, WILL_RETRY};

pub use types::{UploadItem, WorkerSlot};

/// What `cancel` did with the item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Owned item abandoned and discarded; its worker will stop at the next chunk.
    Abandoned {
        /// Worker whose slot was cleared.
        worker: usize,
        /// The item as it was when abandoned.
        item: UploadItem,
    },
    /// Owned item abandoned and moved to the failed set with the given reason.
    Failed {
        /// Worker whose slot was cleared.
        worker: usize,
        /// The item as it now sits in the failed set.
        item: UploadItem,
    },
    /// Pending item removed before any worker claimed it.
    Dequeued(UploadItem),
    /// Item removed from the failed set.
    DroppedFailed(UploadItem),
    /// Item had already been uploaded; nothing changed.
    AlreadyCompleted,
    /// No item with that handle.
    NotFound,
}

impl CancelOutcome {
    /// Whether any collection changed.
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::AlreadyCompleted | Self::NotFound)
    }
}

/// Result of recomputing the accounting from scratch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueAudit {
    /// `bytes_remaining` as maintained incrementally.
    pub recorded_bytes: u64,
    /// Sum of `size - transferred` over pending and owned items.
    pub expected_bytes: u64,
    /// Handles found in more than one place.
    pub duplicate_ids: Vec<ItemId>,
}

impl QueueAudit {
    /// Whether the counters and ownership are consistent.
    pub fn is_consistent(&self) -> bool {
        self.recorded_bytes == self.expected_bytes && self.duplicate_ids.is_empty()
    }
}

/// Manages the upload queue state.
///
/// This is a sync type with no internal locking; the caller
/// (`UploadManager`) is responsible for synchronization.
pub struct UploadQueue {
    pending: VecDeque<UploadItem>,
    slots: Vec<WorkerSlot>,
    failed: Vec<UploadItem>,
    completed: Vec<UploadItem>,
    enabled: bool,
    bytes_remaining: u64,
    items_completed: u64,
    next_id: u64,
    max_item_size: u64,
    max_pending: Option<usize>,
    chunk_size: u64,
    stale_rate_after: Duration,
}

impl UploadQueue {
    /// Create a queue with one slot per worker. Uploading starts enabled.
    pub fn new(workers: usize, config: &UploadManagerConfig) -> Self {
        Self {
            pending: VecDeque::new(),
            slots: (0..workers)
                .map(|_| WorkerSlot::new(config.rate_smoothing))
                .collect(),
            failed: Vec::new(),
            completed: Vec::new(),
            enabled: true,
            bytes_remaining: 0,
            items_completed: 0,
            next_id: 1,
            max_item_size: config.max_item_size,
            max_pending: config.max_pending,
            chunk_size: config.chunk_size,
            stale_rate_after: config.stale_rate_after,
        }
    }

    /// Number of worker slots.
    pub fn workers(&self) -> usize {
        self.slots.len()
    }

    /// Get the number of pending items.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of items currently owned by a worker.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.current.is_some()).count()
    }

    /// Get the number of failed items.
    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    /// Get the number of completed (not yet cleared) items.
    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    /// Unsent bytes across pending and owned items.
    pub const fn bytes_remaining(&self) -> u64 {
        self.bytes_remaining
    }

    /// Whether uploading is enabled.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The item worker `worker` is uploading, if it is still `id`.
    pub fn owned(&self, worker: usize, id: ItemId) -> Option<&UploadItem> {
        self.slots
            .get(worker)
            .and_then(|slot| slot.current.as_ref())
            .filter(|item| item.id == id)
    }

    /// Accept a new item at the tail of the pending queue.
    pub fn enqueue(&mut self, name: impl Into<String>, size: u64) -> UploadResult<ItemId> {
        let name = name.into();
        if size == 0 {
            return Err(UploadError::empty_item(name));
        }
        if size > self.max_item_size {
            return Err(UploadError::too_large(name, size, self.max_item_size));
        }
        if let Some(max) = self.max_pending {
            if self.pending.len() >= max {
                return Err(UploadError::queue_full(max));
            }
        }

        let id = ItemId::new(self.next_id);
        self.next_id += 1;
        self.pending.push_back(UploadItem::new(id, name, size));
        self.bytes_remaining += size;
        Ok(id)
    }

    /// Move the pending head into `worker`'s slot.
    ///
    /// Returns `None` if uploading is disabled, the slot is occupied, or
    /// nothing is pending.
    pub fn claim_next(&mut self, worker: usize) -> Option<UploadItem> {
        if !self.enabled {
            return None;
        }
        let slot = self.slots.get_mut(worker)?;
        if slot.current.is_some() {
            return None;
        }
        let item = self.pending.pop_front()?;
        slot.current = Some(item.clone());
        Some(item)
    }

    /// Record that the mechanism started `id` and reported `actual_size`.
    ///
    /// Reconciles the item size and `bytes_remaining` by the difference and
    /// sets the rate reference point. Returns `false` if the slot no longer
    /// owns the item.
    pub fn record_start(
        &mut self,
        worker: usize,
        id: ItemId,
        actual_size: u64,
        now: Instant,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(worker) else {
            return false;
        };
        let Some(item) = slot.current.as_mut().filter(|item| item.id == id) else {
            return false;
        };

        if item.size != actual_size {
            let old_remaining = item.remaining();
            item.size = actual_size;
            item.transferred = item.transferred.min(actual_size);
            self.bytes_remaining = self.bytes_remaining - old_remaining + item.remaining();
        }
        slot.rate.mark(now);
        true
    }

    /// Set the "finalizing" hint if the next chunk will be the last one.
    ///
    /// Returns the updated item when the text changed.
    pub fn note_next_chunk(&mut self, worker: usize, id: ItemId) -> Option<UploadItem> {
        let chunk_size = self.chunk_size;
        let item = self.owned_mut(worker, id)?;
        if item.remaining() < chunk_size && item.status_text != FINALIZING {
            item.status_text = FINALIZING.to_string();
            return Some(item.clone());
        }
        None
    }

    /// Account for `sent` bytes of `id` confirmed at `now`.
    ///
    /// Returns the updated item, or `None` (with no accounting) if the slot
    /// no longer owns it.
    pub fn record_chunk(
        &mut self,
        worker: usize,
        id: ItemId,
        sent: u64,
        now: Instant,
    ) -> Option<UploadItem> {
        let slot = self.slots.get_mut(worker)?;
        let item = slot.current.as_mut().filter(|item| item.id == id)?;

        let sent = sent.min(item.remaining());
        item.transferred += sent;
        item.status_text = item_progress_text(item.transferred, item.size);
        self.bytes_remaining -= sent;
        slot.rate.record(sent, now);
        Some(item.clone())
    }

    /// Move `id` from `worker`'s slot to the completed set.
    pub fn complete(&mut self, worker: usize, id: ItemId) -> Option<UploadItem> {
        let mut item = self.take_owned(worker, id)?;
        self.bytes_remaining -= item.remaining();
        item.transferred = item.size;
        item.status_text = UPLOADED.to_string();
        self.completed.push(item.clone());
        self.items_completed += 1;
        Some(item)
    }

    /// Move `id` from `worker`'s slot to the failed set with `error` as its text.
    pub fn fail(
        &mut self,
        worker: usize,
        id: ItemId,
        error: impl Into<String>,
    ) -> Option<UploadItem> {
        let item = self.take_owned(worker, id)?;
        self.bytes_remaining -= item.remaining();
        Some(self.push_failed(item, error.into()))
    }

    /// Put `id` back at the head of the pending queue with no progress.
    ///
    /// Used when a worker stops mid-transfer without the item failing.
    pub fn release(&mut self, worker: usize, id: ItemId) -> Option<UploadItem> {
        let mut item = self.take_owned(worker, id)?;
        self.bytes_remaining += item.transferred;
        item.transferred = 0;
        item.status_text = NOT_YET_UPLOADED.to_string();
        self.pending.push_front(item.clone());
        Some(item)
    }

    /// Forget `worker`'s rate history; called when it runs out of work.
    pub fn go_idle(&mut self, worker: usize) {
        if let Some(slot) = self.slots.get_mut(worker) {
            slot.rate.reset();
        }
    }

    /// Cancel `id` wherever it is.
    ///
    /// With a `reason`, an owned item goes to the failed set; otherwise it
    /// is discarded. Pending and failed items are removed. Completed items
    /// are left alone.
    pub fn cancel(&mut self, id: ItemId, reason: Option<String>) -> CancelOutcome {
        if let Some(worker) = self.slots.iter().position(|slot| slot.owns(id)) {
            let Some(mut item) = self.slots[worker].current.take() else {
                return CancelOutcome::NotFound;
            };
            self.bytes_remaining -= item.remaining();
            return match reason {
                Some(why) => {
                    let item = self.push_failed(item, why);
                    CancelOutcome::Failed { worker, item }
                }
                None => {
                    item.status_text = UploadError::Canceled.user_message();
                    CancelOutcome::Abandoned { worker, item }
                }
            };
        }

        if let Some(pos) = self.pending.iter().position(|item| item.id == id) {
            if let Some(mut item) = self.pending.remove(pos) {
                self.bytes_remaining -= item.remaining();
                item.status_text = UploadError::Canceled.user_message();
                return CancelOutcome::Dequeued(item);
            }
        }

        if let Some(pos) = self.failed.iter().position(|item| item.id == id) {
            let mut item = self.failed.remove(pos);
            item.status_text = UploadError::Canceled.user_message();
            return CancelOutcome::DroppedFailed(item);
        }

        if self.completed.iter().any(|item| item.id == id) {
            CancelOutcome::AlreadyCompleted
        } else {
            CancelOutcome::NotFound
        }
    }

    /// Toggle the global pause. Returns whether the flag changed.
    pub const fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }

    /// Move every failed item to the pending tail, reset to zero progress.
    ///
    /// Returns the items moved, in their new queue order.
    pub fn retry_all(&mut self) -> Vec<UploadItem> {
        let mut moved = Vec::with_capacity(self.failed.len());
        for mut item in self.failed.drain(..) {
            item.transferred = 0;
            item.failed = false;
            item.status_text = WILL_RETRY.to_string();
            self.bytes_remaining += item.size;
            moved.push(item.clone());
            self.pending.push_back(item);
        }
        moved
    }

    /// Drop every completed item. Returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let count = self.completed.len();
        self.completed.clear();
        count
    }

    /// Aggregate rate over workers with a fresh estimate.
    pub fn aggregate_rate(&self, now: Instant) -> f64 {
        self.slots
            .iter()
            .map(|slot| slot.rate.current(now, self.stale_rate_after))
            .sum()
    }

    /// Counters from one consistent view.
    pub fn stats(&self, now: Instant) -> QueueStats {
        let in_flight = self.in_flight();
        QueueStats {
            items_left: self.pending.len() + in_flight,
            in_flight,
            bytes_remaining: self.bytes_remaining,
            failed: self.failed.len(),
            completed: self.completed.len(),
            items_completed_total: self.items_completed,
            rate_bps: self.aggregate_rate(now),
            enabled: self.enabled,
        }
    }

    /// Every item in display order: owned, pending, failed, completed.
    pub fn snapshot(&self, now: Instant) -> QueueSnapshot {
        let owned = self.slots.iter().enumerate().filter_map(|(worker, slot)| {
            slot.current
                .as_ref()
                .map(|item| item.to_summary(ItemStatus::Uploading, Some(worker)))
        });
        let pending = self
            .pending
            .iter()
            .map(|item| item.to_summary(ItemStatus::Queued, None));
        let failed = self
            .failed
            .iter()
            .map(|item| item.to_summary(ItemStatus::Failed, None));
        let completed = self
            .completed
            .iter()
            .map(|item| item.to_summary(ItemStatus::Completed, None));

        QueueSnapshot {
            items: owned.chain(pending).chain(failed).chain(completed).collect(),
            stats: self.stats(now),
        }
    }

    /// Recompute `bytes_remaining` and check each handle appears once.
    pub fn audit(&self) -> QueueAudit {
        let owned = self.slots.iter().filter_map(|slot| slot.current.as_ref());
        let expected_bytes: u64 = owned
            .clone()
            .chain(self.pending.iter())
            .map(UploadItem::remaining)
            .sum();

        let mut seen = HashSet::new();
        let mut duplicate_ids: Vec<ItemId> = owned
            .chain(self.pending.iter())
            .chain(self.failed.iter())
            .chain(self.completed.iter())
            .filter(|item| !seen.insert(item.id))
            .map(|item| item.id)
            .collect();
        duplicate_ids.sort_unstable();
        duplicate_ids.dedup();

        QueueAudit {
            recorded_bytes: self.bytes_remaining,
            expected_bytes,
            duplicate_ids,
        }
    }

    // --- Private helpers ---

    fn owned_mut(&mut self, worker: usize, id: ItemId) -> Option<&mut UploadItem> {
        self.slots
            .get_mut(worker)?
            .current
            .as_mut()
            .filter(|item| item.id == id)
    }

    fn take_owned(&mut self, worker: usize, id: ItemId) -> Option<UploadItem> {
        let slot = self.slots.get_mut(worker)?;
        if !slot.owns(id) {
            return None;
        }
        slot.current.take()
    }

    /// The caller must already have removed the item's remainder from
    /// `bytes_remaining`.
    fn push_failed(&mut self, mut item: UploadItem, why: String) -> UploadItem {
        item.failed = true;
        item.status_text = why;
        self.failed.push(item.clone());
        item
    }
}
