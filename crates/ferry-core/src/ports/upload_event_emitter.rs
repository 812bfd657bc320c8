//! Upload event emitter port.
//!
//! This port abstracts event delivery, allowing the upload manager to
//! publish progress without coupling to a UI toolkit or transport.

use tokio::sync::mpsc;

use crate::upload::UploadEvent;

/// Port for emitting upload events.
///
/// Called from worker tasks while no engine lock is held. Implementations
/// must not block; hand the event off and return.
pub trait UploadEventEmitterPort: Send + Sync {
    /// Emit an upload event.
    fn emit(&self, event: UploadEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn UploadEventEmitterPort>;
}

/// A no-op emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopUploadEmitter;

impl NoopUploadEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl UploadEventEmitterPort for NoopUploadEmitter {
    fn emit(&self, _event: UploadEvent) {}

    fn clone_box(&self) -> Box<dyn UploadEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// The receiving side decides which execution context handles them, which
/// is how a GUI thread or a CLI render loop consumes engine notifications.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UploadEventEmitterPort for ChannelEmitter {
    fn emit(&self, event: UploadEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(target: "ferry.events", "Event receiver dropped; discarding event");
        }
    }

    fn clone_box(&self) -> Box<dyn UploadEventEmitterPort> {
        Box::new(self.clone())
    }
}
