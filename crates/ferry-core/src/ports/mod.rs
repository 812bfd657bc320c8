//! Port definitions (trait abstractions) for external systems.
//!
//! The upload engine is protocol-agnostic and presentation-agnostic: it
//! moves bytes through a [`TransferMechanism`] and reports what happened
//! through an [`UploadEventEmitterPort`].

mod transfer_mechanism;
mod upload_event_emitter;

pub use transfer_mechanism::{MechanismError, TransferMechanism};
pub use upload_event_emitter::{ChannelEmitter, NoopUploadEmitter, UploadEventEmitterPort};
