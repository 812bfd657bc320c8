//! Per-item progress event throttling.
//!
//! Chunks can complete far faster than a presentation layer can redraw, so
//! each worker spaces its `ItemProgress` events. State changes (start,
//! completion, failure) always go out; only intermediate progress is
//! dropped.

use std::time::{Duration, Instant};

/// Rate-limiter for a single worker's progress events.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Whether an event observed at `now` should be emitted.
    ///
    /// A zero interval lets every event through.
    pub fn should_emit(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Let the next event through regardless of timing (new item claimed).
    pub const fn reset(&mut self) {
        self.last_emit = None;
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(ferry_core::DEFAULT_PROGRESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_first_emit() {
        let mut throttle = ProgressThrottle::default();
        assert!(throttle.should_emit(Instant::now()));
    }

    #[test]
    fn test_throttle_respects_interval() {
        let t0 = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(50));
        assert!(throttle.should_emit(t0));
        assert!(!throttle.should_emit(t0 + Duration::from_millis(20)));
        assert!(throttle.should_emit(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn test_zero_interval_never_drops() {
        let t0 = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        assert!(throttle.should_emit(t0));
        assert!(throttle.should_emit(t0));
    }

    #[test]
    fn test_throttle_reset() {
        let t0 = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(t0));
        assert!(!throttle.should_emit(t0));

        throttle.reset();
        assert!(throttle.should_emit(t0));
    }
}
