//! Upload domain types, events, errors and snapshots.
//!
//! This module contains pure data types for the upload engine. No I/O,
//! networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Item handle and per-item view (`ItemId`, `ItemSummary`, `ItemStatus`)
//! - `events` - Notifications pushed to the presentation layer (`UploadEvent`)
//! - `errors` - Error taxonomy (`UploadError`)
//! - `queue` - Aggregate views (`QueueStats`, `QueueSnapshot`, `ProgressTexts`)

pub mod errors;
pub mod events;
pub mod queue;
pub mod types;

pub use errors::{UploadError, UploadResult};
pub use events::UploadEvent;
pub use queue::{ProgressTexts, QueueSnapshot, QueueStats};
pub use types::{ItemId, ItemStatus, ItemSummary};
