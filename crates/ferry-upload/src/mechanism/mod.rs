//! Concrete transfer mechanisms.
//!
//! - `file` - reads local files in chunks and hands them to a `ChunkSink`
//!   (`DirectorySink` copies into a local directory)
//! - `simulated` - a `ChunkSink` that sleeps and fails at random

mod file;
mod simulated;

pub use file::{ChunkSink, DirectorySink, FileMechanism};
pub use simulated::{SimulatedMechanism, SimulatedSink, SimulationProfile};
