//! Error types for the sync engine.

use chunksync_manifest::{Checksum, ManifestError};
use chunksync_storage::StorageError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Requested chunk size is outside the configured bounds.
    #[error("invalid chunk size {size}: must be within [{min}, {max}]")]
    InvalidChunkSize {
        /// Requested chunk size.
        size: u64,
        /// Smallest accepted chunk size.
        min: u64,
        /// Largest accepted chunk size.
        max: u64,
    },

    /// The source file does not exist.
    #[error("path not found: {path}")]
    PathNotFound {
        /// Local path or remote locator.
        path: String,
    },

    /// Reading or writing a local file failed.
    #[error("I/O error on {} at offset {offset}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Offset of the failed access.
        offset: u64,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Network or transport error.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote side answered with an error.
    #[error("remote error (status {status}): {message}")]
    Remote {
        /// Response status code.
        status: u16,
        /// Error reported by the remote.
        message: String,
    },

    /// A response could not be decoded or broke the primitive's contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Read-back of a written chunk did not match its descriptor.
    #[error("checksum mismatch after write at offset {offset}: expected {expected}, got {actual}")]
    ChecksumMismatchAfterWrite {
        /// Offset of the chunk.
        offset: u64,
        /// Checksum from the source manifest.
        expected: Checksum,
        /// Checksum of the bytes read back.
        actual: Checksum,
    },

    /// The finished destination has the wrong size.
    #[error("size mismatch after sync: expected {expected} bytes, got {actual}")]
    SizeMismatchAfterSync {
        /// Source size.
        expected: u64,
        /// Destination size on disk.
        actual: u64,
    },

    /// Sync was canceled.
    #[error("sync canceled")]
    Canceled,
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Wraps a storage error raised while accessing `path` at `offset`.
    pub fn from_storage(err: StorageError, path: &Path, offset: u64) -> Self {
        let source = match err {
            StorageError::NotFound { path } => {
                return SyncError::PathNotFound {
                    path: path.display().to_string(),
                }
            }
            StorageError::Io(e) => e,
            other @ StorageError::ReadPastEnd { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, other.to_string())
            }
            other @ StorageError::ReadOnly { .. } => {
                io::Error::new(io::ErrorKind::PermissionDenied, other.to_string())
            }
        };
        SyncError::Io {
            path: path.to_path_buf(),
            offset,
            source,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network { retryable: true, .. })
    }
}

impl From<ManifestError> for SyncError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::InvalidChunkSize { size, min, max } => {
                SyncError::InvalidChunkSize { size, min, max }
            }
            ManifestError::PathNotFound { path } => SyncError::PathNotFound {
                path: path.display().to_string(),
            },
            ManifestError::Io {
                path,
                offset,
                source,
            } => SyncError::Io {
                path,
                offset,
                source,
            },
            other => SyncError::Protocol(other.to_string()),
        }
    }
}

/// A failed sync: the error plus how far the sync got.
///
/// Chunks applied before the failure stay in the destination; re-running the
/// sync picks up from there.
#[derive(Error, Debug)]
#[error("{error} (after {chunks_applied} chunks, {bytes_applied} bytes)")]
pub struct SyncFailure {
    /// What went wrong.
    #[source]
    pub error: SyncError,
    /// Chunks written before the failure.
    pub chunks_applied: u64,
    /// Bytes written before the failure.
    pub bytes_applied: u64,
}

impl SyncFailure {
    /// Creates a failure that happened before any chunk was written.
    pub fn before_transfer(error: SyncError) -> Self {
        Self {
            error,
            chunks_applied: 0,
            bytes_applied: 0,
        }
    }

    /// Returns true if the underlying error can be retried.
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

impl From<SyncError> for SyncFailure {
    fn from(error: SyncError) -> Self {
        Self::before_transfer(error)
    }
}
