//! The sync orchestrator.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncFailure, SyncResult};
use crate::transport::{ChunkSource, LocalSource};
use chunksync_manifest::{diff, Checksum, ChunkDescriptor, Manifest, ManifestBuilder, SyncPlan};
use chunksync_storage::{FileBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A shared cancellation flag.
///
/// Clones observe the same flag. The engine checks it before fetching each
/// chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Syncs that finished successfully.
    pub syncs_completed: u64,
    /// Syncs that aborted.
    pub syncs_failed: u64,
    /// Chunks written across all syncs, including failed ones.
    pub chunks_transferred: u64,
    /// Bytes written across all syncs, including failed ones.
    pub bytes_transferred: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Chunks fetched and written. Zero means the destination was current.
    pub chunks_transferred: u64,
    /// Bytes fetched and written.
    pub bytes_transferred: u64,
    /// Size of the source, and now of the destination.
    pub source_size: u64,
    /// Whether the destination had to be created.
    pub created: bool,
    /// Whether the destination was cut down to the source size.
    pub truncated: bool,
    /// Wall time of the sync.
    pub duration: Duration,
}

impl SyncReport {
    /// Returns true if nothing had to change.
    pub fn is_noop(&self) -> bool {
        self.chunks_transferred == 0 && !self.created && !self.truncated
    }
}

/// Written-so-far counters shared by workers.
#[derive(Default)]
struct Progress {
    chunks: AtomicU64,
    bytes: AtomicU64,
}

impl Progress {
    fn record(&self, chunk: &ChunkDescriptor) {
        self.chunks.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(chunk.length, Ordering::SeqCst);
    }

    fn fail(&self, error: SyncError) -> SyncFailure {
        SyncFailure {
            error,
            chunks_applied: self.chunks.load(Ordering::SeqCst),
            bytes_applied: self.bytes.load(Ordering::SeqCst),
        }
    }
}

/// Drives a destination file to match a source.
///
/// A sync builds or fetches both manifests, diffs them, and transfers only
/// the source chunks the destination lacks. A failed sync leaves the chunks
/// it already wrote in place, so running it again transfers less.
///
/// # Example
///
/// ```rust
/// use chunksync_engine::{LocalSource, SyncConfig, SyncEngine};
/// use chunksync_manifest::ChunkSizeLimits;
///
/// let dir = tempfile::tempdir().unwrap();
/// let src = dir.path().join("src.bin");
/// let dst = dir.path().join("dst.bin");
/// std::fs::write(&src, vec![7u8; 10_000]).unwrap();
///
/// let limits = ChunkSizeLimits::new(1024, 1 << 20);
/// let engine = SyncEngine::new(SyncConfig::new().with_limits(limits));
/// let source = LocalSource::open(&src).unwrap().with_limits(limits);
///
/// let report = engine.sync(&source, &dst, 4096).unwrap();
/// assert_eq!(report.chunks_transferred, 3);
/// assert_eq!(engine.sync(&source, &dst, 4096).unwrap().chunks_transferred, 0);
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    builder: ManifestBuilder,
    stats: RwLock<SyncStats>,
    cancel: CancelToken,
}

impl SyncEngine {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            builder: ManifestBuilder::new(config.limits),
            config,
            stats: RwLock::new(SyncStats::default()),
            cancel: CancelToken::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns a token that cancels this engine's syncs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancels any ongoing sync operation.
    ///
    /// The flag stays set, failing later syncs too, until
    /// [`SyncEngine::reset_cancel`] is called.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resets the canceled flag.
    pub fn reset_cancel(&self) {
        self.cancel.reset();
    }

    fn check_canceled(&self) -> SyncResult<()> {
        if self.cancel.is_canceled() {
            Err(SyncError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Opens a local source that builds manifests within this engine's
    /// chunk size limits.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PathNotFound`] if the file does not exist.
    pub fn open_local(&self, path: impl AsRef<Path>) -> SyncResult<LocalSource> {
        LocalSource::open_with_limits(path, self.config.limits)
    }

    /// Computes what a sync would transfer, without writing anything.
    ///
    /// # Errors
    ///
    /// Fails like [`SyncEngine::sync`] does before its first write.
    pub fn plan(
        &self,
        source: &dyn ChunkSource,
        destination: &Path,
        chunk_size: u64,
    ) -> SyncResult<SyncPlan> {
        self.config.limits.validate(chunk_size)?;
        let source_manifest = source.manifest(chunk_size)?;
        let destination_manifest = self.destination_manifest(destination, chunk_size)?;
        Ok(diff(&source_manifest, destination_manifest.as_ref()))
    }

    /// Makes `destination` byte-identical to `source`.
    ///
    /// `chunk_size` is checked against this engine's limits and must also be
    /// accepted by `source`; [`SyncEngine::open_local`] gives a local source
    /// with matching limits.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncFailure`] carrying the first error and how many chunks
    /// were written before it. Nothing is retried here; see
    /// [`crate::retry::with_retry`].
    pub fn sync(
        &self,
        source: &dyn ChunkSource,
        destination: &Path,
        chunk_size: u64,
    ) -> Result<SyncReport, SyncFailure> {
        let start = Instant::now();
        info!(
            source = %source.locator(),
            destination = %destination.display(),
            chunk_size,
            "sync started"
        );

        let progress = Progress::default();
        let result = self.run(source, destination, chunk_size, &progress);

        let mut stats = self.stats.write();
        stats.chunks_transferred += progress.chunks.load(Ordering::SeqCst);
        stats.bytes_transferred += progress.bytes.load(Ordering::SeqCst);
        stats.last_sync_time = Some(Instant::now());

        match result {
            Ok(mut report) => {
                report.duration = start.elapsed();
                stats.syncs_completed += 1;
                stats.last_error = None;
                info!(
                    destination = %destination.display(),
                    chunks = report.chunks_transferred,
                    bytes = report.bytes_transferred,
                    elapsed_ms = report.duration.as_millis() as u64,
                    "sync finished"
                );
                Ok(report)
            }
            Err(error) => {
                let failure = progress.fail(error);
                stats.syncs_failed += 1;
                stats.last_error = Some(failure.error.to_string());
                warn!(
                    destination = %destination.display(),
                    chunks_applied = failure.chunks_applied,
                    bytes_applied = failure.bytes_applied,
                    error = %failure.error,
                    "sync aborted"
                );
                Err(failure)
            }
        }
    }

    fn run(
        &self,
        source: &dyn ChunkSource,
        destination: &Path,
        chunk_size: u64,
        progress: &Progress,
    ) -> SyncResult<SyncReport> {
        self.config.limits.validate(chunk_size)?;

        let source_manifest = source.manifest(chunk_size)?;
        let source_size = source_manifest.total_size();
        let destination_manifest = self.destination_manifest(destination, chunk_size)?;
        let created = destination_manifest.is_none();

        let plan = diff(&source_manifest, destination_manifest.as_ref());
        debug!(
            chunks = plan.len(),
            bytes = plan.transfer_bytes(),
            truncate_to = ?plan.truncate_to(),
            "computed plan"
        );

        let backend = if created {
            FileBackend::create_sized_with_dirs(destination, source_size)
        } else {
            FileBackend::open(destination)
        }
        .map_err(|e| SyncError::from_storage(e, destination, 0))?;

        if let Some(len) = plan.truncate_to() {
            backend
                .set_len(len)
                .map_err(|e| SyncError::from_storage(e, destination, len))?;
        }

        if self.config.workers <= 1 || plan.len() <= 1 {
            for chunk in plan.iter() {
                self.apply_chunk(source, &backend, destination, chunk)?;
                progress.record(chunk);
            }
        } else {
            self.apply_parallel(source, &backend, destination, plan.chunks(), progress)?;
        }

        self.finish(&backend, destination, source_size)?;

        Ok(SyncReport {
            chunks_transferred: progress.chunks.load(Ordering::SeqCst),
            bytes_transferred: progress.bytes.load(Ordering::SeqCst),
            source_size,
            created,
            truncated: plan.truncate_to().is_some(),
            duration: Duration::ZERO,
        })
    }

    /// Builds the destination manifest, or `None` if it does not exist.
    fn destination_manifest(&self, path: &Path, chunk_size: u64) -> SyncResult<Option<Manifest>> {
        match self.builder.build(path, chunk_size) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(chunksync_manifest::ManifestError::PathNotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn apply_chunk(
        &self,
        source: &dyn ChunkSource,
        backend: &FileBackend,
        path: &Path,
        chunk: &ChunkDescriptor,
    ) -> SyncResult<()> {
        self.check_canceled()?;

        let data = source.fetch(chunk.offset, chunk.length)?;
        if data.len() as u64 != chunk.length {
            return Err(SyncError::Protocol(format!(
                "chunk at offset {} returned {} bytes, expected {}",
                chunk.offset,
                data.len(),
                chunk.length
            )));
        }

        backend
            .write_at(chunk.offset, &data)
            .map_err(|e| SyncError::from_storage(e, path, chunk.offset))?;

        if self.config.verify_writes {
            let written = backend
                .read_at(chunk.offset, data.len())
                .map_err(|e| SyncError::from_storage(e, path, chunk.offset))?;
            let actual = Checksum::compute(&written);
            if actual != chunk.checksum {
                return Err(SyncError::ChecksumMismatchAfterWrite {
                    offset: chunk.offset,
                    expected: chunk.checksum,
                    actual,
                });
            }
        }

        debug!(offset = chunk.offset, length = chunk.length, "chunk applied");
        Ok(())
    }

    /// Applies chunks from a fixed pool of scoped threads.
    ///
    /// Workers claim plan indices from a shared counter. After the first
    /// failure no worker claims another chunk; chunks already in flight
    /// finish and count as applied.
    fn apply_parallel(
        &self,
        source: &dyn ChunkSource,
        backend: &FileBackend,
        path: &Path,
        chunks: &[ChunkDescriptor],
        progress: &Progress,
    ) -> SyncResult<()> {
        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<SyncError>> = Mutex::new(None);
        let workers = self.config.workers.min(chunks.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if failed.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(chunk) = chunks.get(index) else {
                        break;
                    };
                    match self.apply_chunk(source, backend, path, chunk) {
                        Ok(()) => progress.record(chunk),
                        Err(e) => {
                            failed.store(true, Ordering::SeqCst);
                            first_error.lock().get_or_insert(e);
                            break;
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn finish(&self, backend: &FileBackend, path: &Path, expected: u64) -> SyncResult<()> {
        let durable = if self.config.sync_on_finish {
            backend.sync()
        } else {
            backend.flush()
        };
        durable.map_err(|e| SyncError::from_storage(e, path, 0))?;

        let actual = std::fs::metadata(path)
            .map_err(|e| SyncError::Io {
                path: path.to_path_buf(),
                offset: 0,
                source: e,
            })?
            .len();
        if actual != expected {
            return Err(SyncError::SizeMismatchAfterSync { expected, actual });
        }
        Ok(())
    }
}
