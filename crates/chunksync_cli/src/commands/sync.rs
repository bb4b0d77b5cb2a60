//! Sync command implementation.

use super::{chunk_size, emit};
use crate::error::{CliError, CliResult};
use crate::source::{self, Job, Targets};
use crate::OutputFormat;
use chunksync_engine::{with_retry, RetryConfig, SyncConfig, SyncEngine, SyncReport};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Flags for the sync command.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Requested chunk size.
    pub chunk_size: Option<u64>,
    /// Concurrent chunk transfers.
    pub workers: usize,
    /// Read back every written chunk.
    pub verify: bool,
    /// Extra attempts after transient failures.
    pub retries: u32,
}

/// Outcome of syncing one file.
#[derive(Debug, Serialize)]
pub struct FileResult {
    /// Local path or URL of the source.
    pub source: String,
    /// Destination file.
    pub dest: String,
    /// Chunks fetched and written.
    pub chunks_transferred: u64,
    /// Bytes fetched and written.
    pub bytes_transferred: u64,
    /// Final size of the destination.
    pub size: u64,
    /// Whether the destination was created.
    pub created: bool,
    /// Whether the destination was truncated.
    pub truncated: bool,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl FileResult {
    fn new(job: &Job, report: &SyncReport) -> Self {
        Self {
            source: job.source.clone(),
            dest: job.dest.display().to_string(),
            chunks_transferred: report.chunks_transferred,
            bytes_transferred: report.bytes_transferred,
            size: report.source_size,
            created: report.created,
            truncated: report.truncated,
            duration_ms: report.duration.as_millis() as u64,
        }
    }
}

/// Runs the sync command.
///
/// The transfer runs on a blocking thread while Ctrl-C is watched on the
/// runtime; an interrupt cancels the engine, which stops before its next
/// chunk.
pub fn run(source: &str, dest: &Path, options: &SyncOptions, format: OutputFormat) -> CliResult<()> {
    let chunk_size = chunk_size(options.chunk_size)?;
    let targets = source::plan(source, dest)?;

    let config = SyncConfig::new()
        .with_workers(options.workers)
        .with_verify_writes(options.verify);
    let engine = Arc::new(SyncEngine::new(config));
    let retry = RetryConfig::new(options.retries.saturating_add(1));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let token = engine.cancel_token();
    let results = runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, canceling sync");
                token.cancel();
            }
        });

        tokio::task::spawn_blocking(move || sync_all(&engine, &targets, chunk_size, &retry))
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))
    })??;
    runtime.shutdown_background();

    emit(format, &results, |results| {
        for r in results {
            let mut notes = Vec::new();
            if r.created {
                notes.push("created");
            }
            if r.truncated {
                notes.push("truncated");
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            };
            println!(
                "{} -> {}: {} chunks, {} bytes transferred, {} bytes total in {} ms{}",
                r.source,
                r.dest,
                r.chunks_transferred,
                r.bytes_transferred,
                r.size,
                r.duration_ms,
                notes
            );
        }
    })
}

/// Syncs every job in order, stopping at the first failure.
fn sync_all(
    engine: &SyncEngine,
    targets: &Targets,
    chunk_size: u64,
    retry: &RetryConfig,
) -> CliResult<Vec<FileResult>> {
    if let Some(dir) = &targets.dest_dir {
        fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;
    }

    let mut results = Vec::with_capacity(targets.jobs.len());
    for job in &targets.jobs {
        let chunk_source = source::open(&job.source, engine.config().limits)?;
        let report = with_retry(retry, |_| {
            engine.sync(chunk_source.as_ref(), &job.dest, chunk_size)
        })
        .map_err(|failure| CliError::Failed {
            dest: job.dest.clone(),
            failure,
        })?;

        info!(
            source = %job.source,
            dest = %job.dest.display(),
            chunks = report.chunks_transferred,
            "synced"
        );
        results.push(FileResult::new(job, &report));
    }
    Ok(results)
}
