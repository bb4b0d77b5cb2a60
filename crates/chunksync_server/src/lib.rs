//! # chunksync server
//!
//! Serving side of the chunk endpoint.
//!
//! This crate provides:
//! - Manifest retrieval (`method=getchunkmeta`)
//! - Raw chunk fetch (`method=getchunk`)
//! - Path confinement under a served root directory
//! - Error to status-code mapping
//!
//! # Architecture
//!
//! Requests are `GET /api/v1/chunks` with the operation named by the
//! `method` query parameter. The method is looked up in a fixed table of
//! [`Operation`]s, and each operation runs through
//! [`RequestHandler::execute`]. No listener is bundled: an HTTP layer hands
//! the request target to [`ChunkServer::handle_get`] and writes back the
//! response.
//!
//! # Protocol
//!
//! ```text
//! GET /api/v1/chunks?method=getchunkmeta&path=/a.bin&chunksize=4096
//!   -> 200 {"err":"","path":"/a.bin","metas":[{"offset":0,"checksum":"…","len":4096}, …]}
//! GET /api/v1/chunks?method=getchunk&path=/a.bin&offset=4096&chunksize=4096
//!   -> 200 <4096 raw bytes>
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod operation;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, ServerStats};
pub use operation::{Operation, OperationOutput};
pub use server::ChunkServer;
