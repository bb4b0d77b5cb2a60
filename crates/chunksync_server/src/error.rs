//! Error types for the chunk server.

use chunksync_manifest::ManifestError;
use chunksync_storage::StorageError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested chunk size is outside the configured bounds.
    #[error("chunksize error: {size} not within [{min}, {max}]")]
    BadChunkSize {
        /// Requested size.
        size: u64,
        /// Smallest accepted size.
        min: u64,
        /// Largest accepted size.
        max: u64,
    },

    /// The `method` parameter names no known operation.
    #[error("method not allowed: {0:?}")]
    UnknownMethod(String),

    /// The requested file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The requested path escapes the served root.
    #[error("path not allowed: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::BadChunkSize { .. } => 400,
            ServerError::Forbidden(_) => 403,
            ServerError::NotFound(_) => 404,
            ServerError::UnknownMethod(_) => 405,
            ServerError::Internal(_) | ServerError::Io(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

impl From<ManifestError> for ServerError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::InvalidChunkSize { size, min, max } => {
                ServerError::BadChunkSize { size, min, max }
            }
            ManifestError::PathNotFound { path } => ServerError::NotFound(path.display().to_string()),
            ManifestError::Io { source, .. } => ServerError::Io(source),
            ManifestError::InvalidQuery(msg) => ServerError::InvalidRequest(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { path } => ServerError::NotFound(path.display().to_string()),
            StorageError::ReadPastEnd { offset, len, size } => ServerError::InvalidRequest(format!(
                "range {offset}+{len} past end of file ({size} bytes)"
            )),
            StorageError::Io(e) => ServerError::Io(e),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
