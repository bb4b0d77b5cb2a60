//! # chunksync manifest
//!
//! Chunk manifests and manifest diffing for chunksync.
//!
//! This crate provides:
//! - [`Checksum`] - SHA-256 content digest of one chunk
//! - [`ChunkDescriptor`] and [`Manifest`] - the ordered chunk list of a file
//! - [`ManifestBuilder`] - streams a file into a manifest
//! - [`diff`] and [`SyncPlan`] - the chunks a destination is missing
//! - Wire messages for the remote `getchunkmeta` / `getchunk` primitives
//!
//! Chunk boundaries are fixed offsets: chunk `i` always starts at
//! `i * chunk_size`, so two manifests built with the same chunk size line up
//! offset for offset.
//!
//! ## Example
//!
//! ```rust
//! use chunksync_manifest::{diff, ChunkSizeLimits, ManifestBuilder};
//!
//! let builder = ManifestBuilder::new(ChunkSizeLimits::new(4, 64));
//! let source = builder.build_from_reader(&b"aaaabbbbcc"[..], 4).unwrap();
//! let destination = builder.build_from_reader(&b"aaaaXbbbcc"[..], 4).unwrap();
//!
//! let plan = diff(&source, Some(&destination));
//! assert_eq!(plan.len(), 1);
//! assert_eq!(plan.chunks()[0].offset, 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod checksum;
mod chunk;
mod diff;
mod error;
mod manifest;
mod messages;
mod query;

pub use builder::ManifestBuilder;
pub use checksum::{Checksum, CHECKSUM_LEN};
pub use chunk::{
    ChunkDescriptor, ChunkSizeLimits, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNK_SIZE,
    DEFAULT_MIN_CHUNK_SIZE,
};
pub use diff::{diff, SyncPlan};
pub use error::{ManifestError, ManifestResult};
pub use manifest::Manifest;
pub use messages::{
    ChunkMeta, ChunkMetaRequest, ChunkMetaResponse, ChunkRequest, ErrorResponse, HttpResponse,
    CHUNKS_ENDPOINT, CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET_STREAM, METHOD_CHUNK,
    METHOD_CHUNK_META,
};
pub use query::{encode_query, split_target, QueryParams};
