#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod ports;
pub mod upload;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ITEM_SIZE, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_RATE_SMOOTHING, DEFAULT_STALE_RATE_AFTER, UploadManagerConfig,
};
pub use ports::{
    ChannelEmitter, MechanismError, NoopUploadEmitter, TransferMechanism, UploadEventEmitterPort,
};
pub use upload::{
    ItemId, ItemStatus, ItemSummary, ProgressTexts, QueueSnapshot, QueueStats, UploadError,
    UploadEvent, UploadResult,
};
