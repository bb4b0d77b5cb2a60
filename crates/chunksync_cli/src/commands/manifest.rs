//! Manifest command implementation.

use super::{chunk_size, emit};
use crate::error::CliResult;
use crate::source;
use crate::OutputFormat;
use chunksync_manifest::{ChunkDescriptor, ChunkSizeLimits};
use serde::Serialize;

/// The manifest of one file.
#[derive(Debug, Serialize)]
pub struct ManifestResult {
    /// Local path or URL.
    pub path: String,
    /// Chunk size the manifest was built with.
    pub chunk_size: u64,
    /// Sum of the chunk lengths.
    pub file_size: u64,
    /// Chunks in offset order.
    pub chunks: Vec<ChunkDescriptor>,
}

/// Runs the manifest command.
pub fn run(path: &str, requested: Option<u64>, format: OutputFormat) -> CliResult<()> {
    let chunk_size = chunk_size(requested)?;
    let source = source::open(path, ChunkSizeLimits::default())?;
    let manifest = source.manifest(chunk_size)?;

    let result = ManifestResult {
        path: path.to_string(),
        chunk_size,
        file_size: manifest.total_size(),
        chunks: manifest.into_chunks(),
    };

    emit(format, &result, |r| {
        println!(
            "{}: {} bytes, {} chunks of {} bytes",
            r.path,
            r.file_size,
            r.chunks.len(),
            r.chunk_size
        );
        for chunk in &r.chunks {
            println!("{:>14} {:>10} {}", chunk.offset, chunk.length, chunk.checksum);
        }
    })
}
