//! Simulated uploads for demos and soak tests.
//!
//! Reads real files but throws the bytes away, sleeping per chunk and
//! failing at random with configurable probabilities.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::MechanismError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::file::{ChunkSink, FileMechanism};

/// A [`FileMechanism`] that pretends to upload.
pub type SimulatedMechanism = FileMechanism<SimulatedSink>;

/// Timing and failure behaviour of a [`SimulatedSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    /// How long each chunk takes to "send".
    pub chunk_delay: Duration,
    /// Probability in `[0, 1]` that `begin` fails.
    pub start_failure: f64,
    /// Probability in `[0, 1]` that any given chunk fails.
    pub chunk_failure: f64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            chunk_delay: Duration::from_millis(10),
            start_failure: 0.0,
            chunk_failure: 0.0,
            seed: None,
        }
    }
}

impl SimulationProfile {
    #[must_use]
    pub const fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_start_failure(mut self, p: f64) -> Self {
        self.start_failure = p;
        self
    }

    #[must_use]
    pub const fn with_chunk_failure(mut self, p: f64) -> Self {
        self.chunk_failure = p;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Discards bytes after a delay, failing at random.
pub struct SimulatedSink {
    profile: SimulationProfile,
    rng: StdRng,
    bytes_sent: u64,
}

impl SimulatedSink {
    pub fn new(profile: SimulationProfile) -> Self {
        let rng = profile
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            profile,
            rng,
            bytes_sent: 0,
        }
    }

    /// Bytes accepted for the current file.
    pub const fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// `p` outside `[0, 1]` saturates instead of panicking.
    fn roll(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }
}

impl SimulatedMechanism {
    /// Build a simulated mechanism from a profile.
    pub fn simulated(profile: SimulationProfile) -> Self {
        Self::new(SimulatedSink::new(profile))
    }
}

#[async_trait]
impl ChunkSink for SimulatedSink {
    async fn begin(&mut self, _path: &Path, _size: u64) -> Result<(), MechanismError> {
        self.bytes_sent = 0;
        if self.roll(self.profile.start_failure) {
            return Err(MechanismError::failed("random start failure"));
        }
        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), MechanismError> {
        if self.roll(self.profile.chunk_failure) {
            return Err(MechanismError::failed("random upload failure"));
        }
        if !self.profile.chunk_delay.is_zero() {
            tokio::time::sleep(self.profile.chunk_delay).await;
        }
        self.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), MechanismError> {
        Ok(())
    }

    async fn abort(&mut self) {
        self.bytes_sent = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::TransferMechanism;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, len: usize) -> String {
        let path = dir.path().join("sim.bin");
        std::fs::write(&path, vec![7u8; len]).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn quiet() -> SimulationProfile {
        SimulationProfile::default()
            .with_chunk_delay(Duration::ZERO)
            .with_seed(Some(42))
    }

    #[tokio::test]
    async fn test_simulated_upload_completes() {
        let dir = TempDir::new().unwrap();
        let name = write_file(&dir, 10_000);
        let mut mech = SimulatedMechanism::simulated(quiet());

        assert_eq!(mech.start(&name).await.unwrap(), 10_000);
        while !mech.is_complete() {
            mech.next_chunk(4096).await.unwrap();
        }
        assert_eq!(mech.sink().bytes_sent(), 10_000);
    }

    #[tokio::test]
    async fn test_certain_start_failure() {
        let dir = TempDir::new().unwrap();
        let name = write_file(&dir, 100);
        let mut mech = SimulatedMechanism::simulated(quiet().with_start_failure(1.0));

        let err = mech.start(&name).await.unwrap_err();
        assert_eq!(err.to_string(), "random start failure");
        assert_eq!(mech.error_text().as_deref(), Some("random start failure"));
    }

    #[tokio::test]
    async fn test_certain_chunk_failure() {
        let dir = TempDir::new().unwrap();
        let name = write_file(&dir, 100);
        let mut mech = SimulatedMechanism::simulated(quiet().with_chunk_failure(1.0));

        mech.start(&name).await.unwrap();
        let err = mech.next_chunk(4096).await.unwrap_err();
        assert_eq!(err.to_string(), "random upload failure");
        assert!(!mech.is_complete());
    }

    #[test]
    fn test_seeded_rolls_repeat() {
        let mut a = SimulatedSink::new(quiet());
        let mut b = SimulatedSink::new(quiet());
        let rolls_a: Vec<bool> = (0..32).map(|_| a.roll(0.5)).collect();
        let rolls_b: Vec<bool> = (0..32).map(|_| b.roll(0.5)).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_out_of_range_probabilities_saturate() {
        let mut sink = SimulatedSink::new(quiet());
        assert!((0..32).all(|_| sink.roll(1.5)));
        assert!((0..32).all(|_| !sink.roll(-0.5)));
        assert!((0..32).all(|_| !sink.roll(0.0)));
    }
}
