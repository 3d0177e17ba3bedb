//! Streaming upload receiver.
//!
//! Incoming bytes are spooled into a uniquely named temporary file while a running byte count
//! is checked against the configured budget. The temporary file is owned by the returned
//! [`UploadedDocument`] and unlinked when that value is dropped or [`UploadedDocument::cleanup`]
//! is called, so every exit path of a request releases it.

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Hard cap on the size of a single upload (25 MiB).
pub const MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;
/// Size of the blocks written to storage (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Errors produced while receiving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The running byte count exceeded the configured budget.
    #[error("File too large. Max {}MB.", .limit / (1024 * 1024))]
    PayloadTooLarge {
        /// Budget that was exceeded, in bytes.
        limit: u64,
    },
    /// Creating or writing the temporary file failed.
    #[error("Failed to save upload: {0}")]
    Io(#[from] io::Error),
    /// Reading from the source stream failed.
    #[error("Failed to save upload: {0}")]
    Stream(String),
}

/// A fully received upload backed by a temporary file.
#[derive(Debug)]
pub struct UploadedDocument {
    filename: String,
    size_bytes: u64,
    file: NamedTempFile,
}

impl UploadedDocument {
    /// Original filename supplied by the client.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Number of bytes written to storage.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temporary file. Failures are logged and otherwise ignored.
    pub fn cleanup(self) {
        let path = self.file.path().to_path_buf();
        if let Err(error) = self.file.close() {
            tracing::debug!(path = %path.display(), %error, "Temp file cleanup failed");
        }
    }
}

/// Spools upload streams into temporary files under a byte budget.
#[derive(Debug, Clone)]
pub struct UploadReceiver {
    temp_dir: PathBuf,
    max_bytes: u64,
}

impl UploadReceiver {
    /// Build a receiver writing into `temp_dir` with the default [`MAX_FILE_BYTES`] budget.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self::with_limit(temp_dir, MAX_FILE_BYTES)
    }

    /// Build a receiver with an explicit byte budget.
    pub fn with_limit(temp_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            max_bytes,
        }
    }

    /// Configured byte budget.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Drain `stream` into a new temporary file named after `filename`'s extension.
    ///
    /// Stops polling the stream as soon as the budget is exceeded. On any error the partially
    /// written file is removed before returning.
    pub async fn receive<S, E>(
        &self,
        mut stream: S,
        filename: &str,
    ) -> Result<UploadedDocument, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let file = self.create_temp_file(filename)?;
        let mut writer = tokio::fs::File::from_std(file.reopen()?);
        let mut buffer: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);
        let mut total: u64 = 0;

        while let Some(piece) = stream.next().await {
            let mut piece = piece.map_err(|error| UploadError::Stream(error.to_string()))?;
            total += piece.len() as u64;
            if total > self.max_bytes {
                tracing::warn!(
                    filename,
                    limit = self.max_bytes,
                    "Upload exceeded size budget; aborting"
                );
                return Err(UploadError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }

            while !piece.is_empty() {
                let take = piece.len().min(CHUNK_SIZE - buffer.len());
                buffer.extend_from_slice(&piece.split_to(take));
                if buffer.len() == CHUNK_SIZE {
                    writer.write_all(&buffer).await?;
                    buffer.clear();
                }
            }
        }

        if !buffer.is_empty() {
            writer.write_all(&buffer).await?;
        }
        writer.flush().await?;
        writer.sync_all().await?;

        tracing::debug!(
            filename,
            bytes = total,
            path = %file.path().display(),
            "Upload stored"
        );

        Ok(UploadedDocument {
            filename: filename.to_string(),
            size_bytes: total,
            file,
        })
    }

    fn create_temp_file(&self, filename: &str) -> io::Result<NamedTempFile> {
        // Suffix keeps the client's extension byte-for-byte, case included.
        let suffix = Path::new(filename)
            .extension()
            .map(|extension| format!(".{}", extension.to_string_lossy()))
            .unwrap_or_default();
        tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.temp_dir)
    }
}
