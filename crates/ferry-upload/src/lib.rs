#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

// Re-export core types for convenience
pub use ferry_core::{
    ItemId, ItemStatus, ItemSummary, MechanismError, ProgressTexts, QueueSnapshot, QueueStats,
    TransferMechanism, UploadError, UploadEvent, UploadManagerConfig,
};

pub mod mechanism;
pub mod progress;
pub(crate) mod queue;

pub use mechanism::{
    ChunkSink, DirectorySink, FileMechanism, SimulatedMechanism, SimulatedSink, SimulationProfile,
};
pub use queue::{CancelOutcome, QueueAudit};

// Public API
mod manager;

pub use manager::{UploadManager, UploadManagerDeps, WorkerState, build_upload_manager};

