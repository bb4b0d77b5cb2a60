//! # chunksync storage
//!
//! Random-access byte stores used by the chunksync engine.
//!
//! Every chunk a sync transfers is an independently addressed
//! `[offset, offset + len)` range, so backends expose positional reads and
//! writes instead of an append log. Backends do not interpret the bytes they
//! hold; manifests and checksums live in `chunksync_manifest`.
//!
//! ## Design Principles
//!
//! - Positional I/O only (read at, write at, resize)
//! - Writes never touch bytes outside the range they were given
//! - Must be `Send + Sync`: the engine's worker pool writes disjoint chunks
//!   through a shared reference
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing
//! - [`FileBackend`] - For real files, using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use chunksync_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::with_len(16);
//! backend.write_at(4, b"abcd").unwrap();
//! assert_eq!(backend.read_at(4, 4).unwrap(), b"abcd");
//! assert_eq!(backend.size().unwrap(), 16);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
