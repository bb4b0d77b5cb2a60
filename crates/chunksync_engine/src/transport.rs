//! Chunk sources: where the engine gets manifests and chunk bytes from.

use crate::error::{SyncError, SyncResult};
use chunksync_manifest::{ChunkSizeLimits, Manifest, ManifestBuilder};
use chunksync_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A source file the engine can sync from.
///
/// This trait abstracts the source side, allowing for different
/// implementations (local file, HTTP, mock for testing, etc.). Calls may come
/// from several worker threads at once.
pub trait ChunkSource: Send + Sync {
    /// Returns a printable name for the source (path or URL).
    fn locator(&self) -> String;

    /// Returns the manifest of the source built with `chunk_size`.
    fn manifest(&self, chunk_size: u64) -> SyncResult<Manifest>;

    /// Returns exactly `length` bytes starting at `offset`.
    fn fetch(&self, offset: u64, length: u64) -> SyncResult<Vec<u8>>;
}

/// A source file on the local filesystem.
///
/// Each [`ChunkSource::manifest`] call reopens the file, so a source reused
/// across syncs follows the file as it changes on disk.
#[derive(Debug)]
pub struct LocalSource {
    path: PathBuf,
    backend: RwLock<FileBackend>,
    builder: ManifestBuilder,
}

impl LocalSource {
    /// Opens `path` read-only with the default chunk size limits.
    ///
    /// A source with narrower limits than its engine rejects chunk sizes the
    /// engine accepts; use [`LocalSource::open_with_limits`] or
    /// [`crate::SyncEngine::open_local`] to pair them.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PathNotFound`] if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        Self::open_with_limits(path, ChunkSizeLimits::default())
    }

    /// Opens `path` read-only, building manifests within `limits`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PathNotFound`] if the file does not exist.
    pub fn open_with_limits(path: impl AsRef<Path>, limits: ChunkSizeLimits) -> SyncResult<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.to_path_buf(),
            backend: RwLock::new(open_backend(path)?),
            builder: ManifestBuilder::new(limits),
        })
    }

    /// Sets the chunk sizes the source accepts when building its manifest.
    pub fn with_limits(mut self, limits: ChunkSizeLimits) -> Self {
        self.builder = ManifestBuilder::new(limits);
        self
    }

    /// Returns the source path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for LocalSource {
    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn manifest(&self, chunk_size: u64) -> SyncResult<Manifest> {
        let manifest = self.builder.build(&self.path, chunk_size)?;
        *self.backend.write() = open_backend(&self.path)?;
        Ok(manifest)
    }

    fn fetch(&self, offset: u64, length: u64) -> SyncResult<Vec<u8>> {
        self.backend
            .read()
            .read_at(offset, length as usize)
            .map_err(|e| SyncError::from_storage(e, &self.path, offset))
    }
}

fn open_backend(path: &Path) -> SyncResult<FileBackend> {
    FileBackend::open_read_only(path).map_err(|e| SyncError::from_storage(e, path, 0))
}

/// Callback run before each mock fetch, with the fetch offset.
pub type FetchHook = Box<dyn Fn(u64) + Send + Sync>;

/// An in-memory source for testing, with failure injection.
pub struct MockSource {
    data: InMemoryBackend,
    fetches: AtomicU64,
    fail_after: Mutex<Option<u64>>,
    short_reads: Mutex<bool>,
    on_fetch: Mutex<Option<FetchHook>>,
}

impl MockSource {
    /// Creates a source serving `data`.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: InMemoryBackend::with_data(data),
            fetches: AtomicU64::new(0),
            fail_after: Mutex::new(None),
            short_reads: Mutex::new(false),
            on_fetch: Mutex::new(None),
        }
    }

    /// Makes every fetch after the first `n` successful ones fail with a
    /// retryable network error.
    pub fn fail_after(&self, n: u64) {
        *self.fail_after.lock() = Some(self.fetches.load(Ordering::SeqCst) + n);
    }

    /// Stops injecting failures.
    pub fn clear_failure(&self) {
        *self.fail_after.lock() = None;
    }

    /// Makes fetches return one byte less than asked for.
    pub fn set_short_reads(&self, short: bool) {
        *self.short_reads.lock() = short;
    }

    /// Installs a callback run at the start of every fetch.
    pub fn on_fetch(&self, hook: impl Fn(u64) + Send + Sync + 'static) {
        *self.on_fetch.lock() = Some(Box::new(hook));
    }

    /// Returns the number of successful fetches so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Returns a copy of the served data.
    pub fn data(&self) -> Vec<u8> {
        self.data.data()
    }

    /// Replaces the bytes at `offset`, as if the source file changed.
    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        self.data.write_at(offset, bytes)
    }
}

impl ChunkSource for MockSource {
    fn locator(&self) -> String {
        "mock://source".to_string()
    }

    fn manifest(&self, chunk_size: u64) -> SyncResult<Manifest> {
        let limits = ChunkSizeLimits::new(1, chunk_size.max(1));
        let data = self.data.data();
        Ok(ManifestBuilder::new(limits).build_from_reader(&data[..], chunk_size)?)
    }

    fn fetch(&self, offset: u64, length: u64) -> SyncResult<Vec<u8>> {
        if let Some(hook) = self.on_fetch.lock().as_ref() {
            hook(offset);
        }

        {
            // held across the count update so concurrent fetches respect the limit
            let fail_after = self.fail_after.lock();
            if let Some(limit) = *fail_after {
                if self.fetches.load(Ordering::SeqCst) >= limit {
                    return Err(SyncError::network_retryable(format!(
                        "injected failure at offset {offset}"
                    )));
                }
            }
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }

        let size = self.data.size().unwrap_or_default();
        let end = offset.saturating_add(length).min(size);
        if offset >= end {
            return Ok(Vec::new());
        }
        let mut chunk = self
            .data
            .read_at(offset, (end - offset) as usize)
            .map_err(|e| SyncError::Protocol(e.to_string()))?;
        if *self.short_reads.lock() {
            chunk.pop();
        }
        Ok(chunk)
    }
}
