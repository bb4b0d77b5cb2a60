//! CLI command implementations.

pub mod diff;
pub mod manifest;
pub mod sync;

use crate::error::CliResult;
use crate::OutputFormat;
use chunksync_engine::SyncError;
use chunksync_manifest::ChunkSizeLimits;
use serde::Serialize;

/// Resolves the `--chunk-size` flag against the default limits.
pub(crate) fn chunk_size(requested: Option<u64>) -> CliResult<u64> {
    Ok(ChunkSizeLimits::default()
        .resolve(requested)
        .map_err(SyncError::from)?)
}

/// Prints `value` as pretty JSON, or its text rendering.
pub(crate) fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T),
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}
