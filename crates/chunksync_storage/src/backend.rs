//! Storage backend trait definition.

use crate::error::StorageResult;

/// A random-access byte store.
///
/// Backends are **opaque byte stores** addressed by offset. The sync engine
/// reads and writes whole chunks through this trait; it never relies on the
/// backend to understand manifests or checksums.
///
/// # Invariants
///
/// - `write_at(offset, data)` modifies exactly `[offset, offset + data.len())`
/// - `read_at` returns exactly the bytes last written at that range
/// - Writing past the current end grows the store; any gap reads as zeros
/// - Methods take `&self` so disjoint ranges can be written from several
///   threads; implementations serialize access internally
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For real files
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is read-only or an I/O error occurs.
    fn write_at(&self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Resizes the storage to exactly `new_size` bytes.
    ///
    /// Shrinking discards the tail. Growing zero-fills the new region; file
    /// backends leave it sparse where the OS supports it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is read-only or the resize fails.
    fn set_len(&self, new_size: u64) -> StorageResult<()>;

    /// Flushes pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush` - it ensures that
    /// file metadata (size, timestamps) is also durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&self) -> StorageResult<()>;
}
