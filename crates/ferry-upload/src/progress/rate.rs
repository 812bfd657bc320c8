//! Per-worker throughput estimation.
//!
//! Each worker keeps an exponentially weighted moving average of its chunk
//! rate. The aggregate rate is the sum over workers; the ETA divides the
//! remaining bytes by it.

use std::time::{Duration, Instant};

/// EWMA estimate of one worker's upload rate in bytes per second.
///
/// `rate = rate * alpha + (1 - alpha) * instant`, where `instant` is the
/// bytes of a chunk divided by the time since the previous chunk (or since
/// the mechanism's `start` returned, for the first chunk of an item).
#[derive(Debug, Clone)]
pub struct RateEstimator {
    alpha: f64,
    rate_bps: f64,
    /// Reference point for the next instantaneous measurement.
    mark: Option<Instant>,
    /// Bytes recorded at `mark` that could not be timed yet.
    carry: u64,
    last_chunk_at: Option<Instant>,
}

impl RateEstimator {
    /// Create an estimator with smoothing factor `alpha` in `[0, 1)`.
    pub const fn new(alpha: f64) -> Self {
        Self {
            alpha,
            rate_bps: 0.0,
            mark: None,
            carry: 0,
            last_chunk_at: None,
        }
    }

    /// Set the reference point for the next chunk (the moment `start` returned).
    pub const fn mark(&mut self, now: Instant) {
        self.mark = Some(now);
        self.carry = 0;
    }

    /// Feed a completed chunk of `bytes` observed at `now`.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, bytes: u64, now: Instant) {
        self.last_chunk_at = Some(now);

        let Some(mark) = self.mark else {
            self.mark = Some(now);
            self.carry = bytes;
            return;
        };

        let elapsed = now.saturating_duration_since(mark).as_secs_f64();
        if elapsed <= 0.0 {
            // Same clock tick; time these bytes together with the next chunk
            self.carry += bytes;
            return;
        }

        let instant = (bytes + self.carry) as f64 / elapsed;
        self.rate_bps = self.rate_bps.mul_add(self.alpha, (1.0 - self.alpha) * instant);
        self.mark = Some(now);
        self.carry = 0;
    }

    /// Current estimate, or 0 if the last chunk is older than `stale_after`.
    pub fn current(&self, now: Instant, stale_after: Duration) -> f64 {
        match self.last_chunk_at {
            Some(last) if now.saturating_duration_since(last) <= stale_after => self.rate_bps,
            _ => 0.0,
        }
    }

    /// Forget everything (worker went idle).
    pub const fn reset(&mut self) {
        self.rate_bps = 0.0;
        self.mark = None;
        self.carry = 0;
        self.last_chunk_at = None;
    }
}

/// Whole seconds needed to send `bytes` at `rate_bps`, if the rate is known.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn eta_seconds(bytes: u64, rate_bps: f64) -> Option<u64> {
    if rate_bps > 0.0 && rate_bps.is_finite() {
        Some((bytes as f64 / rate_bps) as u64)
    } else {
        None
    }
}

/// Human-readable time remaining, rounded to the nearest minute.
pub fn format_eta(seconds: u64) -> String {
    if seconds < 60 {
        return "Less than 1 minute".to_string();
    }

    if seconds < 3600 {
        let mins = (seconds + 30) / 60;
        return format!("About {mins} {}", super::summary::pl("minute", mins));
    }

    let hours = seconds / 3600;
    let mins = (seconds - hours * 3600 + 30) / 60;
    format!(
        "About {hours} {} and {mins} {}",
        super::summary::pl("hour", hours),
        super::summary::pl("minute", mins)
    )
}
