//! Upload manager implementation.
//!
//! The manager owns the queue state and one worker task per transfer
//! mechanism. Callers use its synchronous methods from any thread; workers
//! run on the tokio runtime and report through the event emitter.
//!
//! # Concurrency Model
//!
//! - All queue state sits behind one `std::sync::Mutex`, never held across
//!   an `.await`
//! - `work_ready` wakes idle workers (enqueue, enable, retry, shutdown)
//! - `resume` wakes workers paused mid-transfer (enable, cancel, shutdown)
//! - Waiters enable their `Notified` before checking the queue, so a
//!   notification between the check and the wait is never lost
//! - Events are collected under the lock and emitted after it is released

mod worker;

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use ferry_core::{
    ConfigError, ItemId, ProgressTexts, QueueSnapshot, QueueStats, TransferMechanism, UploadError,
    UploadEvent, UploadEventEmitterPort, UploadManagerConfig, UploadResult,
};

use crate::progress::{ProgressThrottle, progress_texts};
use crate::queue::{CancelOutcome, QueueAudit, UploadItem, UploadQueue};

pub use worker::WorkerState;

/// Dependencies for creating an upload manager.
pub struct UploadManagerDeps {
    /// One mechanism per worker; the count bounds concurrent transfers.
    pub mechanisms: Vec<Box<dyn TransferMechanism>>,
    /// Port for emitting upload events.
    pub event_emitter: Arc<dyn UploadEventEmitterPort>,
    /// Configuration for the upload manager.
    pub config: UploadManagerConfig,
}

/// Build an upload manager from its dependencies.
///
/// Validates the configuration. Workers are not running until
/// [`UploadManager::start`] is called.
pub fn build_upload_manager(deps: UploadManagerDeps) -> Result<Arc<UploadManager>, ConfigError> {
    deps.config.validate()?;
    if deps.mechanisms.is_empty() {
        return Err(ConfigError::NoWorkers);
    }
    Ok(Arc::new(UploadManager::new(
        deps.mechanisms,
        deps.event_emitter,
        deps.config,
    )))
}

/// What a worker found after waiting out a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    /// Still owns the item and uploading is enabled.
    Continue,
    /// The slot was cleared by a cancel.
    Canceled,
    /// The manager is stopping.
    ShuttingDown,
}

/// Bounded-concurrency upload manager.
pub struct UploadManager {
    queue: Mutex<UploadQueue>,
    /// Wakes idle workers.
    work_ready: Notify,
    /// Wakes workers paused mid-transfer.
    resume: Notify,
    emitter: Arc<dyn UploadEventEmitterPort>,
    config: UploadManagerConfig,
    shutting_down: AtomicBool,
    /// Whether the workers have been spawned (never reset).
    started: AtomicBool,
    /// Mechanisms waiting to be handed to workers by `start`.
    mechanisms: Mutex<Vec<Box<dyn TransferMechanism>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl UploadManager {
    fn new(
        mechanisms: Vec<Box<dyn TransferMechanism>>,
        emitter: Arc<dyn UploadEventEmitterPort>,
        config: UploadManagerConfig,
    ) -> Self {
        Self {
            queue: Mutex::new(UploadQueue::new(mechanisms.len(), &config)),
            work_ready: Notify::new(),
            resume: Notify::new(),
            emitter,
            config,
            shutting_down: AtomicBool::new(false),
            started: AtomicBool::new(false),
            mechanisms: Mutex::new(mechanisms),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// The configuration this manager was built with.
    pub const fn config(&self) -> &UploadManagerConfig {
        &self.config
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.lock_queue().workers()
    }

    // =========================================================================
    // Caller API
    // =========================================================================

    /// Queue `path` for upload with its expected size in bytes.
    pub fn add_item(&self, path: impl Into<String>, size: u64) -> UploadResult<ItemId> {
        if self.is_shutting_down() {
            return Err(UploadError::ShuttingDown);
        }

        let path = path.into();
        let (id, texts) = {
            let mut queue = self.lock_queue();
            let id = match queue.enqueue(path.clone(), size) {
                Ok(id) => id,
                Err(e) => {
                    tracing::info!(target: "ferry.upload", path = %path, error = %e, "Item rejected");
                    return Err(e);
                }
            };
            (id, self.texts(&queue, Instant::now()))
        };

        tracing::info!(target: "ferry.upload", item = %id, path = %path, bytes = size, "Item queued");
        self.emitter.emit(UploadEvent::progress_texts(texts));
        self.work_ready.notify_one();
        Ok(id)
    }

    /// Remove an item wherever it is.
    ///
    /// An uploading item is abandoned, a pending one dequeued, a failed one
    /// dropped. Completed and unknown items are left alone. Returns whether
    /// anything changed.
    pub fn remove_item(&self, id: ItemId) -> bool {
        self.cancel(id, None).changed()
    }

    /// Cancel an item, optionally recording `reason` as a failure.
    ///
    /// With a reason, an uploading item lands in the failed set showing
    /// that reason instead of being discarded.
    pub fn cancel_item(&self, id: ItemId, reason: Option<String>) -> UploadResult<()> {
        match self.cancel(id, reason) {
            CancelOutcome::NotFound => Err(UploadError::not_found(id)),
            _ => Ok(()),
        }
    }

    /// Pause or resume uploading.
    ///
    /// Pausing lets in-flight chunks finish, then holds each worker at its
    /// next chunk boundary.
    pub fn set_uploading_enabled(&self, enabled: bool) {
        let (changed, texts) = {
            let mut queue = self.lock_queue();
            let changed = queue.set_enabled(enabled);
            (changed, self.texts(&queue, Instant::now()))
        };
        if !changed {
            return;
        }

        if enabled {
            tracing::info!(target: "ferry.upload", "Uploading resumed");
        } else {
            tracing::info!(target: "ferry.upload", "Uploading paused");
        }
        self.emitter.emit(UploadEvent::progress_texts(texts));
        self.work_ready.notify_waiters();
        self.resume.notify_waiters();
    }

    /// Whether uploading is enabled.
    pub fn is_uploading_enabled(&self) -> bool {
        self.lock_queue().is_enabled()
    }

    /// Move every failed item back to the end of the queue.
    ///
    /// Returns how many items were requeued.
    pub fn retry_failed_items(&self) -> usize {
        let mut events = Vec::new();
        let count = {
            let mut queue = self.lock_queue();
            let moved = queue.retry_all();
            if moved.is_empty() {
                return 0;
            }
            events.extend(moved.iter().map(progress_event));
            events.push(UploadEvent::FailedCount {
                count: queue.failed_len(),
            });
            events.push(UploadEvent::progress_texts(
                self.texts(&queue, Instant::now()),
            ));
            moved.len()
        };

        tracing::info!(target: "ferry.upload", count, "Retrying failed items");
        self.emit_all(events);
        self.work_ready.notify_waiters();
        count
    }

    /// Drop every completed item. Returns how many were removed.
    pub fn clear_completed_items(&self) -> usize {
        let (count, texts) = {
            let mut queue = self.lock_queue();
            let count = queue.clear_completed();
            (count, self.texts(&queue, Instant::now()))
        };
        if count > 0 {
            tracing::debug!(target: "ferry.upload", count, "Cleared completed items");
            self.emitter.emit(UploadEvent::progress_texts(texts));
        }
        count
    }

    /// Counters from one consistent view of the queue.
    pub fn stats(&self) -> QueueStats {
        self.lock_queue().stats(Instant::now())
    }

    /// Every item with its status, plus the counters.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock_queue().snapshot(Instant::now())
    }

    /// The current summary lines.
    pub fn progress_texts(&self) -> ProgressTexts {
        let queue = self.lock_queue();
        self.texts(&queue, Instant::now())
    }

    /// Recompute the byte accounting and ownership from scratch.
    pub fn audit(&self) -> QueueAudit {
        self.lock_queue().audit()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn one worker task per mechanism.
    ///
    /// Idempotent: only the first call spawns anything.
    pub fn start(self: &Arc<Self>) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mechanisms = std::mem::take(
            &mut *self
                .mechanisms
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let workers = mechanisms.len();
        let spawned: Vec<JoinHandle<()>> = mechanisms
            .into_iter()
            .enumerate()
            .map(|(index, mechanism)| {
                let worker = worker::Worker::new(Arc::clone(self), index, mechanism);
                tokio::spawn(worker.run())
            })
            .collect();

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(spawned);
        tracing::info!(target: "ferry.upload", workers, "Upload manager started");
    }

    /// Stop accepting work and wait for every worker to exit.
    ///
    /// A worker in the middle of an item stops at its next chunk boundary,
    /// cancels its mechanism and puts the item back at the head of the
    /// queue with no progress.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.work_ready.notify_waiters();
        self.resume.notify_waiters();

        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(target: "ferry.upload", error = %e, "Worker task ended abnormally");
            }
        }
        tracing::info!(target: "ferry.upload", "Upload manager stopped");
    }

    /// Whether `shutdown` has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Worker side
    // =========================================================================

    /// Wait until `worker` can claim the pending head, then claim it.
    ///
    /// Returns `None` once the manager is shutting down.
    async fn wait_for_claim(&self, worker: usize) -> Option<UploadItem> {
        loop {
            let mut notified = pin!(self.work_ready.notified());
            notified.as_mut().enable();

            if self.is_shutting_down() {
                return None;
            }
            if let Some(item) = self.claim(worker) {
                return Some(item);
            }
            notified.await;
        }
    }

    fn claim(&self, worker: usize) -> Option<UploadItem> {
        let (item, texts) = {
            let mut queue = self.lock_queue();
            let Some(item) = queue.claim_next(worker) else {
                queue.go_idle(worker);
                return None;
            };
            (item, self.texts(&queue, Instant::now()))
        };

        tracing::debug!(target: "ferry.upload", item = %item.id, worker, "Item claimed");
        self.emitter
            .emit(UploadEvent::ItemStarted { id: item.id, worker });
        self.emitter.emit(UploadEvent::progress_texts(texts));
        Some(item)
    }

    /// Record the size the mechanism reported for `item`.
    ///
    /// Returns `false` if the item was canceled while starting.
    fn record_start(&self, worker: usize, item: &UploadItem, actual_size: u64) -> bool {
        let events = {
            let mut queue = self.lock_queue();
            if !queue.record_start(worker, item.id, actual_size, Instant::now()) {
                return false;
            }
            if actual_size == item.size {
                return true;
            }
            vec![UploadEvent::progress_texts(
                self.texts(&queue, Instant::now()),
            )]
        };

        tracing::debug!(
            target: "ferry.upload",
            item = %item.id,
            worker,
            queued = item.size,
            actual = actual_size,
            "Size reconciled"
        );
        self.emit_all(events);
        true
    }

    /// Publish the "finalizing" hint if the next chunk is the last.
    fn note_next_chunk(&self, worker: usize, id: ItemId) {
        let updated = self.lock_queue().note_next_chunk(worker, id);
        if let Some(item) = updated {
            self.emitter.emit(progress_event(&item));
        }
    }

    /// Account for a confirmed chunk.
    ///
    /// Returns `false` (and accounts nothing) if the slot no longer owns
    /// the item.
    fn record_chunk(
        &self,
        worker: usize,
        id: ItemId,
        sent: u64,
        throttle: &mut ProgressThrottle,
    ) -> bool {
        let now = Instant::now();
        let (item, texts) = {
            let mut queue = self.lock_queue();
            let Some(item) = queue.record_chunk(worker, id, sent, now) else {
                return false;
            };
            (item, self.texts(&queue, now))
        };

        tracing::trace!(
            target: "ferry.upload",
            item = %id,
            worker,
            bytes = sent,
            transferred = item.transferred,
            "Chunk sent"
        );
        if throttle.should_emit(now) {
            self.emitter.emit(progress_event(&item));
            self.emitter.emit(UploadEvent::progress_texts(texts));
        }
        true
    }

    /// Move the item to the completed set. Returns `false` if it was
    /// canceled after its last chunk.
    fn complete(&self, worker: usize, id: ItemId) -> bool {
        let mut events = Vec::new();
        {
            let mut queue = self.lock_queue();
            let Some(item) = queue.complete(worker, id) else {
                return false;
            };
            events.push(progress_event(&item));
            events.push(UploadEvent::ItemCompleted { id });
            events.push(UploadEvent::ClearableItems);
            self.push_summary(&queue, &mut events);
        }

        tracing::info!(target: "ferry.upload", item = %id, worker, "Item uploaded");
        self.emit_all(events);
        true
    }

    /// Move the item to the failed set with the error's text.
    fn fail(&self, worker: usize, id: ItemId, error: &UploadError) {
        let text = error.user_message();
        let mut events = Vec::new();
        {
            let mut queue = self.lock_queue();
            let Some(item) = queue.fail(worker, id, text.clone()) else {
                tracing::debug!(target: "ferry.upload", item = %id, worker, error = %error, "Failure for an item no longer owned");
                return;
            };
            events.push(progress_event(&item));
            events.push(UploadEvent::failed(id, text));
            events.push(UploadEvent::FailedCount {
                count: queue.failed_len(),
            });
            self.push_summary(&queue, &mut events);
        }

        tracing::warn!(target: "ferry.upload", item = %id, worker, error = %error, "Upload failed");
        self.emit_all(events);
    }

    /// Put an interrupted item back at the head of the queue.
    fn release(&self, worker: usize, id: ItemId) {
        let events = {
            let mut queue = self.lock_queue();
            let Some(item) = queue.release(worker, id) else {
                return;
            };
            vec![
                progress_event(&item),
                UploadEvent::progress_texts(self.texts(&queue, Instant::now())),
            ]
        };

        tracing::info!(target: "ferry.upload", item = %id, worker, "Item released back to the queue");
        self.emit_all(events);
    }

    /// Hold `worker` while uploading is disabled.
    ///
    /// On the way into a pause the item's latest progress is published,
    /// since the throttle may have held back the last chunk's update.
    async fn wait_while_paused(&self, worker: usize, id: ItemId) -> Resume {
        let mut flushed = false;
        loop {
            let mut notified = pin!(self.resume.notified());
            notified.as_mut().enable();

            if self.is_shutting_down() {
                return Resume::ShuttingDown;
            }
            let flush = {
                let queue = self.lock_queue();
                let Some(item) = queue.owned(worker, id) else {
                    return Resume::Canceled;
                };
                if queue.is_enabled() {
                    return Resume::Continue;
                }
                (!flushed).then(|| {
                    [
                        progress_event(item),
                        UploadEvent::progress_texts(self.texts(&queue, Instant::now())),
                    ]
                })
            };

            if let Some(events) = flush {
                tracing::debug!(target: "ferry.upload", item = %id, worker, "Paused mid-transfer");
                self.emit_all(events);
                flushed = true;
            }
            notified.await;
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_queue(&self) -> MutexGuard<'_, UploadQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn texts(&self, queue: &UploadQueue, now: Instant) -> ProgressTexts {
        progress_texts(&queue.stats(now), &self.config.item_noun)
    }

    /// Summary lines, plus `QueueDrained` if nothing is left to do.
    ///
    /// Only call after an operation that took an item out of the pending
    /// queue or a worker slot.
    fn push_summary(&self, queue: &UploadQueue, events: &mut Vec<UploadEvent>) {
        let stats = queue.stats(Instant::now());
        events.push(UploadEvent::progress_texts(progress_texts(
            &stats,
            &self.config.item_noun,
        )));
        if stats.is_drained() {
            events.push(UploadEvent::QueueDrained {
                completed_total: stats.items_completed_total,
                failed: stats.failed,
            });
        }
    }

    fn cancel(&self, id: ItemId, reason: Option<String>) -> CancelOutcome {
        let mut events = Vec::new();
        let outcome = {
            let mut queue = self.lock_queue();
            let outcome = queue.cancel(id, reason);
            match &outcome {
                CancelOutcome::Abandoned { item, .. } | CancelOutcome::Dequeued(item) => {
                    events.push(progress_event(item));
                    events.push(UploadEvent::ItemCanceled { id });
                    self.push_summary(&queue, &mut events);
                }
                CancelOutcome::Failed { item, .. } => {
                    events.push(progress_event(item));
                    events.push(UploadEvent::failed(id, item.status_text.clone()));
                    events.push(UploadEvent::FailedCount {
                        count: queue.failed_len(),
                    });
                    self.push_summary(&queue, &mut events);
                }
                CancelOutcome::DroppedFailed(_) => {
                    events.push(UploadEvent::ItemCanceled { id });
                    events.push(UploadEvent::FailedCount {
                        count: queue.failed_len(),
                    });
                    events.push(UploadEvent::progress_texts(
                        self.texts(&queue, Instant::now()),
                    ));
                }
                CancelOutcome::AlreadyCompleted | CancelOutcome::NotFound => {}
            }
            outcome
        };

        match &outcome {
            CancelOutcome::Abandoned { worker, .. } | CancelOutcome::Failed { worker, .. } => {
                tracing::info!(target: "ferry.upload", item = %id, worker, "Upload canceled");
                self.resume.notify_waiters();
            }
            CancelOutcome::Dequeued(_) | CancelOutcome::DroppedFailed(_) => {
                tracing::info!(target: "ferry.upload", item = %id, "Item removed");
            }
            CancelOutcome::AlreadyCompleted => {
                tracing::debug!(target: "ferry.upload", item = %id, "Cancel ignored; item already uploaded");
            }
            CancelOutcome::NotFound => {
                tracing::debug!(target: "ferry.upload", item = %id, "Cancel ignored; unknown item");
            }
        }
        self.emit_all(events);
        outcome
    }

    fn emit_all(&self, events: impl IntoIterator<Item = UploadEvent>) {
        for event in events {
            self.emitter.emit(event);
        }
    }
}

/// `ItemProgress` for the item's current state.
fn progress_event(item: &UploadItem) -> UploadEvent {
    UploadEvent::ItemProgress {
        id: item.id,
        transferred: item.transferred,
        size: item.size,
        failed: item.failed,
        status: item.status_text.clone(),
    }
}
