//! Upload worker: the chunked transfer state machine.
//!
//! A worker owns one transfer mechanism for its whole life and handles one
//! item at a time. It never touches the queue directly; every state change
//! goes through the manager, which re-checks ownership under its lock. A
//! cancel that lands while a mechanism call is in flight is noticed at the
//! next chunk boundary.

use std::fmt;
use std::sync::Arc;

use ferry_core::{ItemId, TransferMechanism, UploadError};

use crate::progress::ProgressThrottle;
use crate::queue::UploadItem;

use super::{Resume, UploadManager};

/// Where a worker is in its current transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for an item to claim.
    Idle,
    /// Claimed an item; `start` is in progress.
    Starting,
    /// Sending chunks.
    Transferring,
    /// Every byte sent; committing the item.
    Finalizing,
    /// The item moved to the completed set.
    Completed,
    /// The item moved to the failed set.
    Failed,
    /// The item was taken away mid-transfer.
    Canceled,
}

impl WorkerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Transferring => "transferring",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(super) struct Worker {
    manager: Arc<UploadManager>,
    index: usize,
    mechanism: Box<dyn TransferMechanism>,
    state: WorkerState,
    throttle: ProgressThrottle,
}

impl Worker {
    pub(super) fn new(
        manager: Arc<UploadManager>,
        index: usize,
        mechanism: Box<dyn TransferMechanism>,
    ) -> Self {
        let throttle = ProgressThrottle::new(manager.config().progress_interval);
        Self {
            manager,
            index,
            mechanism,
            state: WorkerState::Idle,
            throttle,
        }
    }

    /// Claim and upload items until the manager shuts down.
    pub(super) async fn run(mut self) {
        tracing::debug!(target: "ferry.upload", worker = self.index, "Worker started");
        while let Some(item) = self.manager.wait_for_claim(self.index).await {
            self.upload(&item).await;
            self.transition(item.id, WorkerState::Idle);
        }
        tracing::debug!(target: "ferry.upload", worker = self.index, "Worker stopped");
    }

    async fn upload(&mut self, item: &UploadItem) {
        let id = item.id;
        self.throttle.reset();
        self.transition(id, WorkerState::Starting);

        let size = match self.mechanism.start(&item.name).await {
            Ok(size) => size,
            Err(e) => {
                let error = UploadError::start_failed(self.failure_text(&e));
                self.transition(id, WorkerState::Failed);
                self.manager.fail(self.index, id, &error);
                return;
            }
        };

        if !self.manager.record_start(self.index, item, size) {
            self.abandon(id).await;
            return;
        }
        self.transition(id, WorkerState::Transferring);

        let chunk_size = self.manager.config().chunk_size;
        loop {
            match self.manager.wait_while_paused(self.index, id).await {
                Resume::Continue => {}
                Resume::Canceled => {
                    self.abandon(id).await;
                    return;
                }
                Resume::ShuttingDown => {
                    self.manager.release(self.index, id);
                    self.mechanism.cancel().await;
                    return;
                }
            }

            self.manager.note_next_chunk(self.index, id);
            let sent = match self.mechanism.next_chunk(chunk_size).await {
                Ok(sent) => sent,
                Err(e) => {
                    let error = UploadError::chunk_failed(self.failure_text(&e));
                    self.transition(id, WorkerState::Failed);
                    self.manager.fail(self.index, id, &error);
                    return;
                }
            };

            if !self
                .manager
                .record_chunk(self.index, id, sent, &mut self.throttle)
            {
                self.abandon(id).await;
                return;
            }

            if self.mechanism.is_complete() {
                self.transition(id, WorkerState::Finalizing);
                let next = if self.manager.complete(self.index, id) {
                    WorkerState::Completed
                } else {
                    WorkerState::Canceled
                };
                self.transition(id, next);
                return;
            }

            if sent == 0 {
                tokio::task::yield_now().await;
            }
        }
    }

    /// The item is no longer ours; let the mechanism release it.
    async fn abandon(&mut self, id: ItemId) {
        if !self.mechanism.is_complete() {
            self.mechanism.cancel().await;
        }
        self.transition(id, WorkerState::Canceled);
    }

    /// The mechanism's own error text, falling back to the error itself.
    fn failure_text(&self, err: &ferry_core::MechanismError) -> String {
        self.mechanism
            .error_text()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| err.to_string())
    }

    fn transition(&mut self, id: ItemId, next: WorkerState) {
        tracing::debug!(
            target: "ferry.upload",
            worker = self.index,
            item = %id,
            from = %self.state,
            to = %next,
            "Worker state"
        );
        self.state = next;
    }
}
