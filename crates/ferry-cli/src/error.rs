//! CLI-specific error types and mappings.
//!
//! This module provides the error type for the CLI adapter and maps
//! engine errors to exit codes and user-facing messages.

use ferry_core::{ConfigError, UploadError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Upload engine error.
    #[error("{0}")]
    Upload(String),

    /// Some queued files ended in the failed set.
    #[error("{failed} of {queued} files failed to upload")]
    UploadsFailed {
        /// Files that failed.
        failed: usize,
        /// Files that were queued.
        queued: usize,
    },

    /// Argument error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (destination not writable, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ctrl-C before the queue drained.
    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Terminated by SIGINT
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Upload(_) | Self::UploadsFailed { .. } => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Interrupted => 130,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<UploadError> for CliError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::EmptyItem { .. }
            | UploadError::TooLarge { .. }
            | UploadError::QueueFull { .. } => Self::Arguments(err.user_message()),
            other => Self::Upload(other.user_message()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for an error returned from a handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
        assert_eq!(
            CliError::UploadsFailed {
                failed: 1,
                queued: 3
            }
            .exit_code(),
            1
        );
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_config_error_maps_to_config() {
        let err = CliError::from(ConfigError::InvalidChunkSize(0));
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().contains("Chunk size"));
    }

    #[test]
    fn test_validation_errors_are_argument_errors() {
        let err = CliError::from(UploadError::empty_item("a.txt"));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "Invalid arguments: Skipping a.txt because it is empty."
        );
        assert_eq!(CliError::from(UploadError::ShuttingDown).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_through_anyhow() {
        let err = anyhow::Error::from(CliError::Interrupted);
        assert_eq!(exit_code_for(&err), 130);
        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }
}
