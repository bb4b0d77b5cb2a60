//! Ordered chunk manifests.

use crate::chunk::ChunkDescriptor;
use crate::error::{ManifestError, ManifestResult};
use serde::{Deserialize, Serialize};

/// The ordered chunk list of one file at one point in time.
///
/// # Invariants
///
/// A manifest produced by [`crate::ManifestBuilder`] always satisfies:
/// - offsets strictly increase and start at 0
/// - chunks are contiguous: `chunks[i].end() == chunks[i + 1].offset`
/// - every chunk except the last is exactly `chunk_size` bytes
/// - the lengths sum to the file size
///
/// Manifests decoded from the wire are not trusted; call
/// [`Manifest::validate`] before relying on these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    chunk_size: u64,
    chunks: Vec<ChunkDescriptor>,
}

impl Manifest {
    /// Creates an empty manifest (an empty file).
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size,
            chunks: Vec::new(),
        }
    }

    /// Creates a manifest from already computed descriptors.
    pub fn from_chunks(chunk_size: u64, chunks: Vec<ChunkDescriptor>) -> Self {
        Self { chunk_size, chunks }
    }

    /// Appends a descriptor.
    pub fn push(&mut self, chunk: ChunkDescriptor) {
        self.chunks.push(chunk);
    }

    /// Returns the chunk size the manifest was built with.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Returns the descriptors in manifest order.
    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    /// Consumes the manifest, returning its descriptors.
    pub fn into_chunks(self) -> Vec<ChunkDescriptor> {
        self.chunks
    }

    /// Returns an iterator over the descriptors.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkDescriptor> {
        self.chunks.iter()
    }

    /// Returns the number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the manifest describes an empty file.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the size of the described file.
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.length).sum()
    }

    /// Returns true if descriptors are in ascending offset order.
    pub fn is_sorted(&self) -> bool {
        self.chunks.windows(2).all(|w| w[0].offset <= w[1].offset)
    }

    /// Sorts descriptors by offset.
    pub fn sort_by_offset(&mut self) {
        if !self.is_sorted() {
            self.chunks.sort_by_key(|c| c.offset);
        }
    }

    /// Looks up the descriptor starting at `offset`.
    pub fn chunk_at(&self, offset: u64) -> Option<&ChunkDescriptor> {
        if self.chunk_size == 0 || offset % self.chunk_size != 0 {
            return None;
        }
        self.chunks
            .get((offset / self.chunk_size) as usize)
            .filter(|c| c.offset == offset)
    }

    /// Checks the manifest invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidManifest`] naming the first
    /// descriptor that breaks ordering, contiguity, or length rules.
    pub fn validate(&self) -> ManifestResult<()> {
        if self.chunk_size == 0 && !self.chunks.is_empty() {
            return Err(ManifestError::invalid_manifest(0, "chunk size is zero"));
        }

        let mut expected_offset = 0u64;
        let last = self.chunks.len().saturating_sub(1);

        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.offset != expected_offset {
                return Err(ManifestError::invalid_manifest(
                    index,
                    format!(
                        "offset {} does not follow previous chunk end {}",
                        chunk.offset, expected_offset
                    ),
                ));
            }
            if chunk.length == 0 || chunk.length > self.chunk_size {
                return Err(ManifestError::invalid_manifest(
                    index,
                    format!(
                        "length {} outside (0, {}]",
                        chunk.length, self.chunk_size
                    ),
                ));
            }
            if index != last && chunk.length != self.chunk_size {
                return Err(ManifestError::invalid_manifest(
                    index,
                    format!(
                        "short chunk of {} bytes before the last chunk",
                        chunk.length
                    ),
                ));
            }
            expected_offset = chunk.end();
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ChunkDescriptor;
    type IntoIter = std::slice::Iter<'a, ChunkDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksum;

    fn desc(offset: u64, length: u64) -> ChunkDescriptor {
        ChunkDescriptor::new(offset, length, Checksum::compute(&offset.to_le_bytes()))
    }

    #[test]
    fn empty_manifest() {
        let manifest = Manifest::new(4);
        assert!(manifest.is_empty());
        assert_eq!(manifest.total_size(), 0);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn total_size_sums_lengths() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 4), desc(4, 4), desc(8, 2)]);
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.total_size(), 10);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn validate_rejects_gap() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 4), desc(8, 4)]);
        let err = manifest.validate().unwrap_err();
        assert!(matches!(err, ManifestError::InvalidManifest { index: 1, .. }));
    }

    #[test]
    fn validate_rejects_short_middle_chunk() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 2), desc(2, 4)]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::InvalidManifest { index: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_oversized_chunk() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 5)]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn sort_by_offset() {
        let mut manifest = Manifest::from_chunks(4, vec![desc(8, 2), desc(0, 4), desc(4, 4)]);
        assert!(!manifest.is_sorted());

        manifest.sort_by_offset();
        assert!(manifest.is_sorted());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn chunk_at_offset() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 4), desc(4, 4), desc(8, 2)]);
        assert_eq!(manifest.chunk_at(8).map(|c| c.length), Some(2));
        assert!(manifest.chunk_at(6).is_none());
        assert!(manifest.chunk_at(12).is_none());
    }

    #[test]
    fn serde_json_shape() {
        let manifest = Manifest::from_chunks(4, vec![desc(0, 3)]);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["chunk_size"], 4);
        assert_eq!(json["chunks"][0]["length"], 3);
        assert!(json["chunks"][0]["checksum"].is_string());
    }
}
