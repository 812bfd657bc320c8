//! Progress tracking: rate estimation, summary texts and event throttling.

pub mod rate;
pub mod summary;
mod throttle;

pub use rate::{RateEstimator, eta_seconds, format_eta};
pub use summary::{completed_text, item_progress_text, pending_text, pl, progress_texts};
pub use throttle::ProgressThrottle;
