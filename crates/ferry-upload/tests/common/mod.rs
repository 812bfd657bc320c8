//! Shared fixtures for upload manager integration tests.
//!
//! `ScriptedMechanism` moves bytes in memory. Sizes, failures and pacing
//! come from a `Script` shared between the test and every worker, so a
//! test can hold chunks back, inject failures and inspect the calls made.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::{ChannelEmitter, UploadEventEmitterPort};
use ferry_upload::{
    ItemId, ItemSummary, MechanismError, TransferMechanism, UploadEvent, UploadManager,
    UploadManagerConfig, UploadManagerDeps, build_upload_manager,
};
use tokio::sync::{Semaphore, mpsc};

/// A mechanism call, as recorded by the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Chunk(String, u64),
    Cancel(String),
}

#[derive(Default)]
struct ScriptState {
    sizes: HashMap<String, u64>,
    fail_start: HashSet<String>,
    fail_at: HashMap<String, u64>,
    calls: Vec<Call>,
    active: usize,
    max_active: usize,
    waiting: usize,
}

/// Behaviour shared by every `ScriptedMechanism` built from it.
#[derive(Clone)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
    /// `None` lets chunks through freely; otherwise each chunk takes a permit.
    gate: Option<Arc<Semaphore>>,
}

impl Script {
    /// Chunks go through as fast as they are asked for.
    pub fn open() -> Self {
        Self {
            state: Arc::default(),
            gate: None,
        }
    }

    /// Each chunk waits for a permit from [`Script::allow`].
    pub fn gated() -> Self {
        Self {
            state: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// The size `start` reports for `name`.
    pub fn with_size(self, name: &str, size: u64) -> Self {
        self.lock().sizes.insert(name.to_string(), size);
        self
    }

    /// Make `start` fail for `name`.
    pub fn failing_start(self, name: &str) -> Self {
        self.lock().fail_start.insert(name.to_string());
        self
    }

    /// Make the chunk after `offset` bytes of `name` fail.
    pub fn failing_at(self, name: &str, offset: u64) -> Self {
        self.lock().fail_at.insert(name.to_string(), offset);
        self
    }

    /// Stop injecting failures for `name`.
    pub fn heal(&self, name: &str) {
        let mut state = self.lock();
        state.fail_start.remove(name);
        state.fail_at.remove(name);
    }

    /// Let `n` more chunks through a gated script.
    pub fn allow(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn starts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn chunks_of(&self, name: &str) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Chunk(n, sent) if n == name => Some(sent),
                _ => None,
            })
            .collect()
    }

    /// Most transfers that were open at the same time.
    pub fn max_active(&self) -> usize {
        self.lock().max_active
    }

    /// Workers currently blocked in `next_chunk` waiting for a permit.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }

    pub fn mechanism(&self) -> ScriptedMechanism {
        ScriptedMechanism {
            script: self.clone(),
            current: None,
            complete: false,
            error: None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap()
    }
}

struct Transfer {
    name: String,
    size: u64,
    offset: u64,
}

/// In-memory mechanism driven by a [`Script`].
pub struct ScriptedMechanism {
    script: Script,
    current: Option<Transfer>,
    complete: bool,
    error: Option<String>,
}

impl ScriptedMechanism {
    fn close(&mut self) {
        if self.current.take().is_some() {
            self.script.lock().active -= 1;
        }
    }

    fn fail(&mut self, text: String) -> MechanismError {
        self.close();
        self.error = Some(text.clone());
        MechanismError::failed(text)
    }
}

#[async_trait]
impl TransferMechanism for ScriptedMechanism {
    async fn start(&mut self, name: &str) -> Result<u64, MechanismError> {
        if self.current.is_some() {
            return Err(MechanismError::AlreadyStarted);
        }
        self.complete = false;
        self.error = None;

        let outcome = {
            let mut state = self.script.lock();
            state.calls.push(Call::Start(name.to_string()));
            if state.fail_start.contains(name) {
                Err(format!("refused: {name}"))
            } else if let Some(&size) = state.sizes.get(name) {
                state.active += 1;
                state.max_active = state.max_active.max(state.active);
                Ok(size)
            } else {
                Err(format!("does not exist: {name}"))
            }
        };

        match outcome {
            Err(text) => Err(self.fail(text)),
            Ok(size) => {
                self.current = Some(Transfer {
                    name: name.to_string(),
                    size,
                    offset: 0,
                });
                Ok(size)
            }
        }
    }

    async fn next_chunk(&mut self, max_bytes: u64) -> Result<u64, MechanismError> {
        if self.current.is_none() {
            return Err(MechanismError::NotStarted);
        }

        if let Some(gate) = self.script.gate.clone() {
            self.script.lock().waiting += 1;
            let permit = gate.acquire().await;
            self.script.lock().waiting -= 1;
            permit.expect("gate is never closed").forget();
        }

        let Some(transfer) = self.current.as_mut() else {
            return Err(MechanismError::NotStarted);
        };
        let fail_at = self.script.lock().fail_at.get(&transfer.name).copied();
        if fail_at.is_some_and(|at| transfer.offset >= at) {
            return Err(self.fail("upload failed".to_string()));
        }

        let sent = max_bytes.min(transfer.size - transfer.offset);
        transfer.offset += sent;
        self.script
            .lock()
            .calls
            .push(Call::Chunk(transfer.name.clone(), sent));
        if transfer.offset == transfer.size {
            self.complete = true;
            self.close();
        }
        Ok(sent)
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    async fn cancel(&mut self) {
        if let Some(transfer) = &self.current {
            let name = transfer.name.clone();
            self.script.lock().calls.push(Call::Cancel(name));
        }
        self.close();
        self.error = Some("canceled".to_string());
    }

    fn error_text(&self) -> Option<String> {
        self.error.clone()
    }
}

/// A started manager with `workers` mechanisms from `script`.
pub fn start_manager(
    script: &Script,
    workers: usize,
    config: UploadManagerConfig,
) -> (Arc<UploadManager>, mpsc::UnboundedReceiver<UploadEvent>) {
    let (emitter, events) = ChannelEmitter::new();
    let event_emitter: Arc<dyn UploadEventEmitterPort> = Arc::new(emitter);
    let mechanisms = (0..workers)
        .map(|_| Box::new(script.mechanism()) as Box<dyn TransferMechanism>)
        .collect();

    let manager = build_upload_manager(UploadManagerDeps {
        mechanisms,
        event_emitter,
        config,
    })
    .unwrap();
    manager.start();
    (manager, events)
}

/// Config with every progress event let through.
pub fn test_config() -> UploadManagerConfig {
    UploadManagerConfig::default().with_progress_interval(Duration::ZERO)
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

/// Await `future`, failing the test after a few seconds.
pub async fn within<F: Future>(what: &str, future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

/// Everything emitted so far.
pub fn drain(events: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// The current view of one item, if the manager still knows it.
pub fn item(manager: &UploadManager, id: ItemId) -> Option<ItemSummary> {
    manager.snapshot().items.into_iter().find(|item| item.id == id)
}

/// Assert the byte accounting and ownership are consistent.
pub fn assert_consistent(manager: &UploadManager) {
    let audit = manager.audit();
    assert!(audit.is_consistent(), "inconsistent queue: {audit:?}");
}
