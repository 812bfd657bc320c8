//! Upload manager configuration.
//!
//! Limits and tuning knobs for the upload engine. Infrastructure choices
//! (which mechanisms to run, where events go) are passed separately when
//! the manager is built.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default largest item accepted, in bytes (16 MiB).
pub const DEFAULT_MAX_ITEM_SIZE: u64 = 16 * 1024 * 1024;

/// Default number of bytes requested per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 4096;

/// Default EWMA smoothing factor for the per-worker rate.
pub const DEFAULT_RATE_SMOOTHING: f64 = 0.5;

/// Default age after which a worker's rate stops counting.
pub const DEFAULT_STALE_RATE_AFTER: Duration = Duration::from_secs(10);

/// Default minimum spacing between per-item progress events.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for creating an upload manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadManagerConfig {
    /// Largest item accepted by `add_item`, in bytes.
    pub max_item_size: u64,
    /// Bytes requested from the mechanism per `next_chunk` call.
    pub chunk_size: u64,
    /// Weight given to the previous rate estimate, in `[0, 1)`.
    pub rate_smoothing: f64,
    /// A worker whose last chunk is older than this contributes no rate.
    pub stale_rate_after: Duration,
    /// Minimum spacing between `ItemProgress` events for one worker.
    pub progress_interval: Duration,
    /// Optional cap on the number of pending items.
    pub max_pending: Option<usize>,
    /// Word used for items in summary texts ("item", "photo", ...).
    pub item_noun: String,
}

impl Default for UploadManagerConfig {
    fn default() -> Self {
        Self {
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            rate_smoothing: DEFAULT_RATE_SMOOTHING,
            stale_rate_after: DEFAULT_STALE_RATE_AFTER,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_pending: None,
            item_noun: "item".to_string(),
        }
    }
}

impl UploadManagerConfig {
    /// Set the largest accepted item size.
    #[must_use]
    pub const fn with_max_item_size(mut self, max: u64) -> Self {
        self.max_item_size = max;
        self
    }

    /// Set the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the rate smoothing factor.
    #[must_use]
    pub const fn with_rate_smoothing(mut self, alpha: f64) -> Self {
        self.rate_smoothing = alpha;
        self
    }

    /// Set the stale-rate cutoff.
    #[must_use]
    pub const fn with_stale_rate_after(mut self, after: Duration) -> Self {
        self.stale_rate_after = after;
        self
    }

    /// Set the progress event interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the pending queue cap.
    #[must_use]
    pub const fn with_max_pending(mut self, max: Option<usize>) -> Self {
        self.max_pending = max;
        self
    }

    /// Set the noun used in summary texts.
    #[must_use]
    pub fn with_item_noun(mut self, noun: impl Into<String>) -> Self {
        self.item_noun = noun.into();
        self
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_item_size == 0 {
            return Err(ConfigError::InvalidMaxItemSize);
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if !(0.0..1.0).contains(&self.rate_smoothing) {
            return Err(ConfigError::InvalidRateSmoothing(self.rate_smoothing));
        }

        if self.max_pending == Some(0) {
            return Err(ConfigError::InvalidMaxPending);
        }

        if self.item_noun.trim().is_empty() {
            return Err(ConfigError::EmptyItemNoun);
        }

        Ok(())
    }
}

/// Config validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Max item size must be at least 1 byte")]
    InvalidMaxItemSize,

    #[error("Chunk size must be at least 1 byte, got {0}")]
    InvalidChunkSize(u64),

    #[error("Rate smoothing must be in [0, 1), got {0}")]
    InvalidRateSmoothing(f64),

    #[error("Max pending items must be at least 1 when set")]
    InvalidMaxPending,

    #[error("Item noun cannot be empty")]
    EmptyItemNoun,

    #[error("At least one transfer mechanism is required")]
    NoWorkers,
}

impl ConfigError {
    /// Text suitable for a CLI error line.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Invalid upload configuration: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UploadManagerConfig::default();
        assert_eq!(config.max_item_size, 16 * 1024 * 1024);
        assert_eq!(config.chunk_size, 4096);
        assert!((config.rate_smoothing - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.stale_rate_after, Duration::from_secs(10));
        assert_eq!(config.max_pending, None);
        assert_eq!(config.item_noun, "item");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = UploadManagerConfig::default()
            .with_chunk_size(1024)
            .with_max_item_size(10)
            .with_max_pending(Some(3))
            .with_item_noun("photo");
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.max_item_size, 10);
        assert_eq!(config.max_pending, Some(3));
        assert_eq!(config.item_noun, "photo");
    }

    #[test]
    fn test_validate_zero_chunk_size() {
        let config = UploadManagerConfig::default().with_chunk_size(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_validate_rate_smoothing_range() {
        let config = UploadManagerConfig::default().with_rate_smoothing(1.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRateSmoothing(1.0))
        );

        let config = UploadManagerConfig::default().with_rate_smoothing(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_pending() {
        let config = UploadManagerConfig::default().with_max_pending(Some(0));
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxPending));
    }

    #[test]
    fn test_validate_blank_noun() {
        let config = UploadManagerConfig::default().with_item_noun("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyItemNoun));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: UploadManagerConfig =
            serde_json::from_str(r#"{"chunk_size": 8192, "item_noun": "photo"}"#).unwrap();
        assert_eq!(config.chunk_size, 8192);
        assert_eq!(config.item_noun, "photo");
        assert_eq!(config.max_item_size, DEFAULT_MAX_ITEM_SIZE);
    }
}
