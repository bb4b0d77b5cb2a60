//! Error types for manifest operations.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while building, validating, or decoding manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
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

    /// The file to chunk does not exist.
    #[error("path not found: {}", .path.display())]
    PathNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Reading the file failed.
    #[error("I/O error reading {} at offset {offset}: {source}", .path.display())]
    Io {
        /// File being read (empty for anonymous readers).
        path: PathBuf,
        /// Offset of the window that failed.
        offset: u64,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A checksum string is not valid hex of the right width.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// A manifest violates ordering or contiguity invariants.
    #[error("invalid manifest at chunk {index}: {reason}")]
    InvalidManifest {
        /// Index of the first offending descriptor.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A request query string is missing a parameter or has a bad value.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// JSON encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl ManifestError {
    /// Wraps an `io::Error` hit while opening or reading `path`.
    pub fn from_io(err: io::Error, path: &Path, offset: u64) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ManifestError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Io {
                path: path.to_path_buf(),
                offset,
                source: err,
            }
        }
    }

    /// Creates an invalid-manifest error.
    pub fn invalid_manifest(index: usize, reason: impl Into<String>) -> Self {
        ManifestError::InvalidManifest {
            index,
            reason: reason.into(),
        }
    }
}
