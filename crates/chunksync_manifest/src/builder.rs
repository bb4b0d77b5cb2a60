//! Builds manifests by streaming a file.

use crate::chunk::{ChunkDescriptor, ChunkSizeLimits};
use crate::error::{ManifestError, ManifestResult};
use crate::manifest::Manifest;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Streams a file in fixed-size windows and checksums each one.
///
/// Memory use is one `chunk_size` buffer regardless of file size.
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    limits: ChunkSizeLimits,
}

impl ManifestBuilder {
    /// Creates a builder accepting chunk sizes within `limits`.
    pub fn new(limits: ChunkSizeLimits) -> Self {
        Self { limits }
    }

    /// Returns the accepted chunk sizes.
    pub fn limits(&self) -> &ChunkSizeLimits {
        &self.limits
    }

    /// Builds the manifest of the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::InvalidChunkSize`] if `chunk_size` is out of bounds
    /// - [`ManifestError::PathNotFound`] if the file does not exist
    /// - [`ManifestError::Io`] for any other open or read failure
    ///
    /// No partial manifest is returned on error.
    pub fn build(&self, path: &Path, chunk_size: u64) -> ManifestResult<Manifest> {
        let chunk_size = self.limits.validate(chunk_size)?;
        let file = File::open(path).map_err(|e| ManifestError::from_io(e, path, 0))?;

        let manifest = chunk_reader(file, chunk_size)
            .map_err(|(offset, e)| ManifestError::from_io(e, path, offset))?;

        debug!(
            path = %path.display(),
            chunk_size,
            chunks = manifest.len(),
            size = manifest.total_size(),
            "built manifest"
        );
        Ok(manifest)
    }

    /// Builds a manifest from any reader.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::InvalidChunkSize`] if `chunk_size` is out of bounds
    /// - [`ManifestError::Io`] if reading fails
    pub fn build_from_reader<R: Read>(&self, reader: R, chunk_size: u64) -> ManifestResult<Manifest> {
        let chunk_size = self.limits.validate(chunk_size)?;
        chunk_reader(reader, chunk_size).map_err(|(offset, source)| ManifestError::Io {
            path: PathBuf::new(),
            offset,
            source,
        })
    }
}

/// Reads `reader` to the end, one `chunk_size` window at a time.
///
/// On failure returns the offset of the window being read.
fn chunk_reader<R: Read>(mut reader: R, chunk_size: u64) -> Result<Manifest, (u64, io::Error)> {
    let mut buffer = vec![0u8; chunk_size as usize];
    let mut manifest = Manifest::new(chunk_size);
    let mut offset = 0u64;

    loop {
        let n = fill_window(&mut reader, &mut buffer).map_err(|e| (offset, e))?;
        if n == 0 {
            break;
        }

        manifest.push(ChunkDescriptor::for_data(offset, &buffer[..n]));
        offset += n as u64;

        if n < buffer.len() {
            break;
        }
    }

    Ok(manifest)
}

/// Fills `buf` completely unless the stream ends first.
///
/// `Read::read` may return short counts mid-file; looping here keeps every
/// chunk but the last at exactly `chunk_size`.
fn fill_window<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksum;
    use tempfile::tempdir;

    fn small_builder() -> ManifestBuilder {
        ManifestBuilder::new(ChunkSizeLimits::new(2, 1024))
    }

    /// Returns at most `step` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken {
        good: usize,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "device error"));
            }
            let n = self.good.min(buf.len());
            buf[..n].fill(7);
            self.good -= n;
            Ok(n)
        }
    }

    #[test]
    fn chunks_cover_input() {
        let data: Vec<u8> = (0..10u8).collect();
        let manifest = small_builder().build_from_reader(&data[..], 4).unwrap();

        let lengths: Vec<u64> = manifest.iter().map(|c| c.length).collect();
        assert_eq!(lengths, vec![4, 4, 2]);
        assert_eq!(manifest.chunks()[1].offset, 4);
        assert_eq!(manifest.chunks()[1].checksum, Checksum::compute(&data[4..8]));
        assert_eq!(manifest.total_size(), 10);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let data = [1u8; 12];
        let manifest = small_builder().build_from_reader(&data[..], 4).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.chunks()[2].length, 4);
    }

    #[test]
    fn empty_input_has_no_chunks() {
        let manifest = small_builder().build_from_reader(io::empty(), 4).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.chunk_size(), 4);
    }

    #[test]
    fn short_reads_do_not_split_chunks() {
        let data: Vec<u8> = (0..20u8).collect();
        let trickle = Trickle {
            data: &data,
            step: 3,
        };
        let manifest = small_builder().build_from_reader(trickle, 8).unwrap();

        let lengths: Vec<u64> = manifest.iter().map(|c| c.length).collect();
        assert_eq!(lengths, vec![8, 8, 4]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_chunk_size() {
        let result = small_builder().build_from_reader(&b"abc"[..], 1);
        assert!(matches!(
            result,
            Err(ManifestError::InvalidChunkSize { size: 1, .. })
        ));

        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"abc").unwrap();
        assert!(matches!(
            small_builder().build(&path, 4096),
            Err(ManifestError::InvalidChunkSize { .. })
        ));
    }

    #[test]
    fn read_error_discards_partial_manifest() {
        let result = small_builder().build_from_reader(Broken { good: 6 }, 4);
        match result {
            Err(ManifestError::Io { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn build_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let manifest = small_builder().build(&path, 4).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.total_size(), 11);
        assert_eq!(manifest.chunks()[2].checksum, Checksum::compute(b"rld"));
    }

    #[test]
    fn missing_file_is_path_not_found() {
        let dir = tempdir().unwrap();
        let result = small_builder().build(&dir.path().join("missing.bin"), 4);
        assert!(matches!(result, Err(ManifestError::PathNotFound { .. })));
    }
}
