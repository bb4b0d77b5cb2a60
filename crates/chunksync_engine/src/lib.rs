//! # chunksync engine
//!
//! Sync orchestrator and chunk transports for chunksync.
//!
//! This crate provides:
//! - [`SyncEngine`] - makes a destination file byte-identical to a source
//! - [`ChunkSource`] - where manifests and chunk bytes come from
//! - [`LocalSource`] and [`HttpSource`] - filesystem and remote sources
//! - Cancellation, statistics, and caller-side retry
//!
//! ## Architecture
//!
//! A sync runs in one pass:
//! 1. Obtain the source manifest (built locally or fetched remotely)
//! 2. Build the destination manifest, or pre-create a missing destination
//! 3. Diff the two and truncate the destination if it is too long
//! 4. Fetch and write each planned chunk at its offset
//! 5. Flush and check the final size
//!
//! ## Key Invariants
//!
//! - Only chunks whose checksums differ are transferred
//! - Every write is confined to its chunk's byte range
//! - A failed sync keeps the chunks it wrote; a rerun transfers the rest
//! - The engine never retries on its own

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
pub mod retry;
mod transport;

pub use config::{RetryConfig, SyncConfig};
pub use engine::{CancelToken, SyncEngine, SyncReport, SyncStats};
pub use error::{SyncError, SyncFailure, SyncResult};
pub use http::{HttpClient, HttpSource, LoopbackClient, LoopbackServer};
pub use retry::{with_retry, Retryable};
pub use transport::{ChunkSource, FetchHook, LocalSource, MockSource};
