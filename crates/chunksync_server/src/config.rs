//! Server configuration.

use chunksync_manifest::ChunkSizeLimits;
use std::path::PathBuf;

/// Configuration for the chunk server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory that request paths are resolved under.
    pub root: PathBuf,
    /// Accepted chunk sizes for manifests and chunk fetches.
    pub limits: ChunkSizeLimits,
}

impl ServerConfig {
    /// Creates a configuration serving files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limits: ChunkSizeLimits::default(),
        }
    }

    /// Sets the accepted chunk sizes.
    pub fn with_limits(mut self, limits: ChunkSizeLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
