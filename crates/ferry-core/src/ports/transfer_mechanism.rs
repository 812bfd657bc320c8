//! Transfer mechanism port.
//!
//! A mechanism performs the actual chunked send for one item at a time.
//! The upload worker only knows this contract, never the protocol behind it
//! (local copy, HTTP, a vendor API, a simulation).
//!
//! # Call order
//!
//! ```text
//! start(name) ─┬─> next_chunk(max) ──> next_chunk(max) ──> ... until is_complete()
//!              └─> cancel()   (any time after start, before completion is observed)
//! ```
//!
//! After a failing call, `error_text()` describes the failure. Calling
//! `next_chunk` before `start`, or after completion or cancellation, is a
//! caller bug; implementations answer it with [`MechanismError::NotStarted`].

use async_trait::async_trait;
use thiserror::Error;

/// Error reported by a transfer mechanism.
///
/// The `Display` form is the human-readable text shown next to the failed
/// item, so variants render their message without a prefix.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MechanismError {
    /// `next_chunk` was called with no upload in progress.
    #[error("no upload is in progress")]
    NotStarted,

    /// `start` was called while a previous upload was still open.
    #[error("an upload is already in progress")]
    AlreadyStarted,

    /// Local I/O failed (opening or reading the source).
    #[error("{message}")]
    Io {
        /// Error message.
        message: String,
    },

    /// The destination refused or failed the transfer.
    #[error("{message}")]
    Failed {
        /// Error message.
        message: String,
    },
}

impl MechanismError {
    /// Create an I/O failure.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a destination failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MechanismError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Port for moving one item's bytes in bounded chunks.
///
/// Each worker owns one mechanism exclusively, hence `&mut self`. Calls may
/// await on I/O for as long as they need; the upload manager never holds its
/// queue lock across them.
#[async_trait]
pub trait TransferMechanism: Send {
    /// Begin uploading `name`.
    ///
    /// Returns the authoritative size in bytes, which may differ from the
    /// size the item was queued with.
    async fn start(&mut self, name: &str) -> Result<u64, MechanismError>;

    /// Send at most `max_bytes` of the current item.
    ///
    /// Returns the number of bytes actually sent (possibly fewer than asked).
    async fn next_chunk(&mut self, max_bytes: u64) -> Result<u64, MechanismError>;

    /// Whether every byte of the current item has been sent and finalized.
    fn is_complete(&self) -> bool;

    /// Abandon the current upload and release whatever it holds.
    async fn cancel(&mut self);

    /// Text describing the most recent failure, if any.
    fn error_text(&self) -> Option<String>;
}

#[async_trait]
impl<M: TransferMechanism + ?Sized> TransferMechanism for Box<M> {
    async fn start(&mut self, name: &str) -> Result<u64, MechanismError> {
        (**self).start(name).await
    }

    async fn next_chunk(&mut self, max_bytes: u64) -> Result<u64, MechanismError> {
        (**self).next_chunk(max_bytes).await
    }

    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }

    async fn cancel(&mut self) {
        (**self).cancel().await;
    }

    fn error_text(&self) -> Option<String> {
        (**self).error_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sends everything in one chunk.
    #[derive(Default)]
    struct OneShot {
        size: u64,
        sent: u64,
        started: bool,
        err: Option<String>,
    }

    #[async_trait]
    impl TransferMechanism for OneShot {
        async fn start(&mut self, name: &str) -> Result<u64, MechanismError> {
            self.size = name.len() as u64;
            self.sent = 0;
            self.started = true;
            Ok(self.size)
        }

        async fn next_chunk(&mut self, _max_bytes: u64) -> Result<u64, MechanismError> {
            if !self.started {
                let err = MechanismError::NotStarted;
                self.err = Some(err.to_string());
                return Err(err);
            }
            self.sent = self.size;
            Ok(self.size)
        }

        fn is_complete(&self) -> bool {
            self.started && self.sent == self.size
        }

        async fn cancel(&mut self) {
            self.started = false;
        }

        fn error_text(&self) -> Option<String> {
            self.err.clone()
        }
    }

    #[test]
    fn test_error_display_is_bare_message() {
        assert_eq!(
            MechanismError::failed("server said no").to_string(),
            "server said no"
        );
        assert_eq!(
            MechanismError::NotStarted.to_string(),
            "no upload is in progress"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(MechanismError::from(io), MechanismError::io("gone"));
    }

    #[tokio::test]
    async fn test_boxed_mechanism_delegates() {
        let mut mech: Box<dyn TransferMechanism> = Box::new(OneShot::default());

        let err = mech.next_chunk(10).await.unwrap_err();
        assert_eq!(err, MechanismError::NotStarted);
        assert_eq!(mech.error_text().as_deref(), Some("no upload is in progress"));

        assert_eq!(mech.start("abcd").await.unwrap(), 4);
        assert!(!mech.is_complete());
        assert_eq!(mech.next_chunk(10).await.unwrap(), 4);
        assert!(mech.is_complete());
    }
}
