//! Chunk descriptors and chunk-size bounds.

use crate::checksum::Checksum;
use crate::error::{ManifestError, ManifestResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Smallest chunk size accepted by default (4 KiB).
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 4 * 1024;

/// Largest chunk size accepted by default (8 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Chunk size used when a request does not name one (2 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// One fixed-offset chunk of a file.
///
/// Describes exactly `length` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    /// Byte offset of the chunk in the file.
    pub offset: u64,
    /// Number of bytes in the chunk; never zero.
    pub length: u64,
    /// Digest of the chunk's bytes.
    pub checksum: Checksum,
}

impl ChunkDescriptor {
    /// Creates a descriptor.
    pub fn new(offset: u64, length: u64, checksum: Checksum) -> Self {
        Self {
            offset,
            length,
            checksum,
        }
    }

    /// Creates a descriptor for `data` located at `offset`.
    pub fn for_data(offset: u64, data: &[u8]) -> Self {
        Self::new(offset, data.len() as u64, Checksum::compute(data))
    }

    /// Returns the offset one past the last byte of the chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Returns the byte range the chunk covers.
    pub fn range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

/// Accepted chunk sizes plus the size used when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSizeLimits {
    /// Smallest accepted chunk size.
    pub min: u64,
    /// Largest accepted chunk size.
    pub max: u64,
    /// Size used when a request leaves the chunk size empty.
    pub default: u64,
}

impl ChunkSizeLimits {
    /// Creates limits accepting `[min, max]`.
    ///
    /// The default size is [`DEFAULT_CHUNK_SIZE`] clamped into the range.
    pub fn new(min: u64, max: u64) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            default: DEFAULT_CHUNK_SIZE.clamp(min, max),
        }
    }

    /// Sets the default chunk size, clamped into `[min, max]`.
    pub fn with_default(mut self, default: u64) -> Self {
        self.default = default.clamp(self.min, self.max);
        self
    }

    /// Returns true if `size` is within bounds.
    pub fn contains(&self, size: u64) -> bool {
        (self.min..=self.max).contains(&size)
    }

    /// Checks that `size` is within bounds and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidChunkSize`] when out of bounds.
    pub fn validate(&self, size: u64) -> ManifestResult<u64> {
        if self.contains(size) {
            Ok(size)
        } else {
            Err(ManifestError::InvalidChunkSize {
                size,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Resolves an optional requested size, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidChunkSize`] when a given size is out
    /// of bounds.
    pub fn resolve(&self, size: Option<u64>) -> ManifestResult<u64> {
        match size {
            Some(size) => self.validate(size),
            None => Ok(self.default),
        }
    }
}

impl Default for ChunkSizeLimits {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_CHUNK_SIZE,
            max: DEFAULT_MAX_CHUNK_SIZE,
            default: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_range() {
        let desc = ChunkDescriptor::for_data(8, b"abcd");
        assert_eq!(desc.length, 4);
        assert_eq!(desc.end(), 12);
        assert_eq!(desc.range(), 8..12);
    }

    #[test]
    fn default_limits() {
        let limits = ChunkSizeLimits::default();
        assert!(limits.contains(DEFAULT_CHUNK_SIZE));
        assert!(limits.contains(4 * 1024 * 1024));
        assert!(!limits.contains(DEFAULT_MIN_CHUNK_SIZE - 1));
        assert!(!limits.contains(DEFAULT_MAX_CHUNK_SIZE + 1));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let limits = ChunkSizeLimits::new(16, 64);
        assert_eq!(limits.validate(16).unwrap(), 16);
        assert_eq!(limits.validate(64).unwrap(), 64);
        assert!(matches!(
            limits.validate(15),
            Err(ManifestError::InvalidChunkSize {
                size: 15,
                min: 16,
                max: 64
            })
        ));
        assert!(limits.validate(65).is_err());
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let limits = ChunkSizeLimits::new(16, 64).with_default(32);
        assert_eq!(limits.resolve(None).unwrap(), 32);
        assert_eq!(limits.resolve(Some(48)).unwrap(), 48);
        assert!(limits.resolve(Some(1)).is_err());
    }

    #[test]
    fn default_is_clamped() {
        let limits = ChunkSizeLimits::new(16, 64);
        assert_eq!(limits.default, 64);

        let limits = limits.with_default(1);
        assert_eq!(limits.default, 16);
    }
}
