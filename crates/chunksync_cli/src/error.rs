//! CLI error types.

use chunksync_engine::{SyncError, SyncFailure};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// A directory source listed a sub-directory.
    #[error("only files are supported: {0}")]
    OnlyFiles(PathBuf),

    /// A directory source needs a directory destination.
    #[error("destination should be a directory: {0}")]
    DestinationNotDirectory(PathBuf),

    /// Local filesystem error outside the engine.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The HTTP client could not be set up.
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),

    /// An engine call failed before any transfer.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A sync failed part way through.
    #[error("sync of {dest} failed: {failure}")]
    Failed {
        /// Destination being synced.
        dest: PathBuf,
        /// The failure with its progress.
        failure: SyncFailure,
    },

    /// Result encoding failed.
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),

    /// The signal-handling runtime could not start.
    #[error("runtime: {0}")]
    Runtime(String),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
