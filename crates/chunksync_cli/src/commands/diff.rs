//! Diff command implementation.

use super::{chunk_size, emit};
use crate::error::CliResult;
use crate::source;
use crate::OutputFormat;
use chunksync_engine::{SyncConfig, SyncEngine};
use chunksync_manifest::{ChunkDescriptor, ChunkSizeLimits};
use serde::Serialize;
use std::path::Path;

/// What a sync of one file would do.
#[derive(Debug, Serialize)]
pub struct DiffResult {
    /// Local path or URL of the source.
    pub source: String,
    /// Destination file.
    pub dest: String,
    /// Chunk size used for both manifests.
    pub chunk_size: u64,
    /// Size of the source.
    pub source_size: u64,
    /// Length the destination would be cut to, if it is too long.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate_to: Option<u64>,
    /// Bytes that would be fetched.
    pub transfer_bytes: u64,
    /// Source chunks that would be fetched.
    pub chunks: Vec<ChunkDescriptor>,
}

/// Runs the diff command.
pub fn run(source: &str, dest: &Path, requested: Option<u64>, format: OutputFormat) -> CliResult<()> {
    let chunk_size = chunk_size(requested)?;
    let chunk_source = source::open(source, ChunkSizeLimits::default())?;
    let engine = SyncEngine::new(SyncConfig::default());
    let plan = engine.plan(chunk_source.as_ref(), dest, chunk_size)?;

    let result = DiffResult {
        source: source.to_string(),
        dest: dest.display().to_string(),
        chunk_size,
        source_size: plan.source_size(),
        truncate_to: plan.truncate_to(),
        transfer_bytes: plan.transfer_bytes(),
        chunks: plan.chunks().to_vec(),
    };

    emit(format, &result, |r| {
        if r.chunks.is_empty() && r.truncate_to.is_none() {
            println!("{} is up to date with {}", r.dest, r.source);
            return;
        }
        println!(
            "{} chunks ({} bytes) differ between {} and {}",
            r.chunks.len(),
            r.transfer_bytes,
            r.source,
            r.dest
        );
        for chunk in &r.chunks {
            println!("  offset {:>14} len {:>10}", chunk.offset, chunk.length);
        }
        if let Some(len) = r.truncate_to {
            println!("  truncate to {len} bytes");
        }
    })
}
