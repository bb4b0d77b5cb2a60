//! Test fixtures and file helpers.
//!
//! Provides temporary directories holding source/destination file pairs
//! and helpers for mutating them in controlled ways.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory of test files with automatic cleanup.
pub struct TestFiles {
    dir: TempDir,
}

impl TestFiles {
    /// Creates a new empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of `name` inside the directory, without creating it.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `data` to `name`, creating parent directories.
    pub fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, data).expect("Failed to write test file");
        path
    }

    /// Copies `from` to `name` and returns the new path.
    pub fn copy(&self, from: &Path, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::copy(from, &path).expect("Failed to copy test file");
        path
    }

    /// Reads a whole file.
    pub fn read(&self, path: &Path) -> Vec<u8> {
        fs::read(path).expect("Failed to read test file")
    }
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `len` bytes of repeatable pseudo-random data for `seed`.
pub fn patterned(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Inverts the byte at `offset` in the file at `path`.
pub fn flip_byte(path: &Path, offset: u64) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .expect("Failed to open file for mutation");
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(offset)).expect("seek");
    file.read_exact(&mut byte).expect("read byte");
    byte[0] = !byte[0];
    file.seek(SeekFrom::Start(offset)).expect("seek");
    file.write_all(&byte).expect("write byte");
}

/// Appends `data` to the file at `path`.
pub fn append(path: &Path, data: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("Failed to open file for append");
    file.write_all(data).expect("append");
}

/// Cuts or extends the file at `path` to `len` bytes.
pub fn set_len(path: &Path, len: u64) {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|f| f.set_len(len))
        .expect("Failed to resize file");
}

/// Inverts one byte at each of `offsets` in an in-memory buffer.
pub fn flip_bytes(data: &mut [u8], offsets: &[usize]) {
    for &offset in offsets {
        data[offset] = !data[offset];
    }
}

/// Common source/destination layouts.
pub mod scenarios {
    use super::*;

    /// A source file and a destination that differs in the chunks
    /// containing `changed_offsets`.
    pub fn modified_pair(
        files: &TestFiles,
        len: usize,
        changed_offsets: &[usize],
    ) -> (PathBuf, PathBuf) {
        let source = patterned(len, 1);
        let mut destination = source.clone();
        flip_bytes(&mut destination, changed_offsets);
        (
            files.write("source.bin", &source),
            files.write("destination.bin", &destination),
        )
    }
}
