//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file does not exist.
    #[error("file not found: {}", .path.display())]
    NotFound {
        /// The path that was opened.
        path: PathBuf,
    },

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// A write was attempted on a backend opened read-only.
    #[error("storage is read-only: {}", .path.display())]
    ReadOnly {
        /// The path of the read-only file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Maps an `io::Error` raised while opening `path`, turning
    /// `NotFound` into [`StorageError::NotFound`].
    pub fn from_open(err: io::Error, path: &std::path::Path) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StorageError::Io(err)
        }
    }

    /// Returns true if this error means the file is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound { .. } => true,
            StorageError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
