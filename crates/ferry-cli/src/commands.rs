//! Commands enum and their arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand};
use ferry_core::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ITEM_SIZE};

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files and wait until the queue drains
    Upload(UploadArgs),
}

/// Arguments for `ferry upload`.
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["dest", "simulate"])))]
pub struct UploadArgs {
    /// Files to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Number of concurrent transfers
    #[arg(short, long, env = "FERRY_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Copy files into this directory
    #[arg(long, env = "FERRY_DEST")]
    pub dest: Option<PathBuf>,

    /// Read files but discard the bytes
    #[arg(long)]
    pub simulate: bool,

    /// Bytes sent per chunk
    #[arg(long, env = "FERRY_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u64,

    /// Largest file accepted, in bytes
    #[arg(long, env = "FERRY_MAX_SIZE", default_value_t = DEFAULT_MAX_ITEM_SIZE)]
    pub max_size: u64,

    /// Cap on the number of queued files
    #[arg(long, env = "FERRY_MAX_PENDING")]
    pub max_pending: Option<usize>,

    /// Word used for items in progress lines
    #[arg(long, env = "FERRY_ITEM_NOUN", default_value = "file")]
    pub noun: String,

    /// Probability that a simulated upload fails to start
    #[arg(long, env = "FERRY_FAIL_START", default_value_t = 0.0, conflicts_with = "dest")]
    pub fail_start: f64,

    /// Probability that any simulated chunk fails
    #[arg(long, env = "FERRY_FAIL_CHUNK", default_value_t = 0.0, conflicts_with = "dest")]
    pub fail_chunk: f64,

    /// Simulated time per chunk, in milliseconds
    #[arg(long, env = "FERRY_CHUNK_DELAY_MS", default_value_t = 10)]
    pub chunk_delay_ms: u64,

    /// Seed for simulated failures
    #[arg(long, env = "FERRY_SEED")]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use clap::Parser;

    use super::*;

    fn upload(args: &[&str]) -> UploadArgs {
        let cli = Cli::parse_from(std::iter::once("ferry").chain(args.iter().copied()));
        let Commands::Upload(args) = cli.command;
        args
    }

    #[test]
    fn test_upload_defaults() {
        let args = upload(&["upload", "--dest", "/tmp/out", "a.jpg", "b.jpg"]);
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.dest, Some(PathBuf::from("/tmp/out")));
        assert!(!args.simulate);
        assert_eq!(args.chunk_size, 4096);
        assert_eq!(args.max_size, 16 * 1024 * 1024);
        assert_eq!(args.noun, "file");
    }

    #[test]
    fn test_simulation_flags() {
        let args = upload(&[
            "upload",
            "--simulate",
            "--fail-chunk",
            "0.25",
            "--seed",
            "7",
            "-w",
            "4",
            "a.jpg",
        ]);
        assert!(args.simulate);
        assert!((args.fail_chunk - 0.25).abs() < f64::EPSILON);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.workers, 4);
    }

    #[test]
    fn test_target_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["ferry", "upload", "a.jpg"]).is_err());
        assert!(
            Cli::try_parse_from(["ferry", "upload", "--simulate", "--dest", "/tmp", "a.jpg"])
                .is_err()
        );
    }

    #[test]
    fn test_failure_flags_need_simulation() {
        assert!(
            Cli::try_parse_from(["ferry", "upload", "--dest", "/tmp", "--fail-start", "1", "a"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["ferry", "upload", "--dest", "/tmp", "--fail-chunk", "0.5", "a"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["ferry", "upload", "--simulate", "--fail-start", "1", "a"])
                .is_ok()
        );
    }
}
