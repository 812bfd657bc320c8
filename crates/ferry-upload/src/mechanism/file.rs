//! File-backed transfer mechanism.
//!
//! [`FileMechanism`] owns the parts every file upload shares: validating
//! the path, reading the file in bounded chunks, finalizing once every byte
//! is out, and reporting failures as human-readable text. Where the bytes
//! go is delegated to a [`ChunkSink`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ferry_core::{MechanismError, TransferMechanism};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

/// Generic texts used when a sink fails without saying why.
const START_FAILED: &str = "upload failed to start";
const SEND_FAILED: &str = "upload failed";
const FINISH_FAILED: &str = "couldn't finalize";

/// Destination side of a [`FileMechanism`].
///
/// A sink sees one file at a time: `begin`, any number of `send`s in file
/// order, then either `finish` or `abort`. Returning an error with an empty
/// message makes the mechanism report a generic text for that step.
#[async_trait]
pub trait ChunkSink: Send {
    /// Prepare to receive `size` bytes of `path`.
    async fn begin(&mut self, path: &Path, size: u64) -> Result<(), MechanismError>;

    /// Deliver the next bytes of the file.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), MechanismError>;

    /// Every byte was delivered; commit the upload.
    async fn finish(&mut self) -> Result<(), MechanismError>;

    /// The upload was halted before `finish`. Release whatever `begin` took.
    async fn abort(&mut self);
}

/// Reads a local file in chunks and hands them to a [`ChunkSink`].
pub struct FileMechanism<S> {
    sink: S,
    file: Option<BufReader<File>>,
    size: u64,
    offset: u64,
    complete: bool,
    error: Option<String>,
    buffer: Vec<u8>,
}

impl<S: ChunkSink> FileMechanism<S> {
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            file: None,
            size: 0,
            offset: 0,
            complete: false,
            error: None,
            buffer: Vec::new(),
        }
    }

    /// The sink this mechanism writes to.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Stop the current upload, record `err` as the error text and return it.
    async fn halt(&mut self, err: MechanismError) -> MechanismError {
        self.error = Some(err.to_string());
        self.file = None;
        self.complete = false;
        self.sink.abort().await;
        err
    }
}

/// Replace a blank sink error with the step's generic text.
fn or_generic(err: MechanismError, generic: &str) -> MechanismError {
    if err.to_string().trim().is_empty() {
        MechanismError::failed(generic)
    } else {
        err
    }
}

#[async_trait]
impl<S: ChunkSink> TransferMechanism for FileMechanism<S> {
    async fn start(&mut self, name: &str) -> Result<u64, MechanismError> {
        if self.file.is_some() {
            return Err(self.halt(MechanismError::AlreadyStarted).await);
        }

        let path = Path::new(name);
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let err = MechanismError::io(format!("does not exist: {name}"));
                return Err(self.halt(err).await);
            }
            Err(e) => return Err(self.halt(e.into()).await),
        };
        if !meta.is_file() {
            let err = MechanismError::io(format!("not a file: {name}"));
            return Err(self.halt(err).await);
        }

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => return Err(self.halt(e.into()).await),
        };

        self.file = Some(BufReader::new(file));
        self.size = meta.len();
        self.offset = 0;
        self.complete = false;
        self.error = None;

        if let Err(e) = self.sink.begin(path, self.size).await {
            return Err(self.halt(or_generic(e, START_FAILED)).await);
        }
        Ok(self.size)
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn next_chunk(&mut self, max_bytes: u64) -> Result<u64, MechanismError> {
        let Some(file) = self.file.as_mut() else {
            let err = MechanismError::NotStarted;
            self.error = Some(err.to_string());
            return Err(err);
        };

        let want = (self.size - self.offset).min(max_bytes) as usize;
        let mut sent = 0;
        if want > 0 {
            if self.buffer.len() < want {
                self.buffer.resize(want, 0);
            }
            let read = match file.read(&mut self.buffer[..want]).await {
                Ok(0) => {
                    let err = MechanismError::io("unexpected end of file");
                    return Err(self.halt(err).await);
                }
                Ok(n) => n,
                Err(e) => return Err(self.halt(e.into()).await),
            };

            if let Err(e) = self.sink.send(&self.buffer[..read]).await {
                return Err(self.halt(or_generic(e, SEND_FAILED)).await);
            }
            self.offset += read as u64;
            sent = read as u64;
        }

        if self.offset == self.size {
            if let Err(e) = self.sink.finish().await {
                return Err(self.halt(or_generic(e, FINISH_FAILED)).await);
            }
            self.file = None;
            self.complete = true;
            self.error = None;
        }
        Ok(sent)
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    async fn cancel(&mut self) {
        self.halt(MechanismError::failed("canceled")).await;
    }

    fn error_text(&self) -> Option<String> {
        self.error.clone()
    }
}

/// Copies each file into a destination directory.
///
/// Bytes land in `<name>.part` and are renamed into place on `finish`, so
/// an aborted upload never leaves a truncated file under the final name.
pub struct DirectorySink {
    dest: PathBuf,
    current: Option<(File, PathBuf, PathBuf)>,
}

impl DirectorySink {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            current: None,
        }
    }
}

#[async_trait]
impl ChunkSink for DirectorySink {
    async fn begin(&mut self, path: &Path, _size: u64) -> Result<(), MechanismError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| MechanismError::io(format!("not a file: {}", path.display())))?;

        let target = self.dest.join(file_name);
        let mut part_name = file_name.to_os_string();
        part_name.push(".part");
        let part = self.dest.join(part_name);

        let file = File::create(&part).await?;
        self.current = Some((file, part, target));
        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), MechanismError> {
        let (file, _, _) = self.current.as_mut().ok_or(MechanismError::NotStarted)?;
        file.write_all(bytes).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), MechanismError> {
        let (file, _, _) = self.current.as_mut().ok_or(MechanismError::NotStarted)?;
        file.flush().await?;
        file.sync_all().await?;

        if let Some((file, part, target)) = self.current.take() {
            drop(file);
            if let Err(e) = tokio::fs::rename(&part, &target).await {
                remove_partial(&part).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn abort(&mut self) {
        if let Some((file, part, _)) = self.current.take() {
            drop(file);
            remove_partial(&part).await;
        }
    }
}

async fn remove_partial(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        tracing::debug!(
            target: "ferry.mechanism",
            path = %part.display(),
            error = %e,
            "Could not remove partial upload"
        );
    }
}
