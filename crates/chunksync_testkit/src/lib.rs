//! # chunksync testkit
//!
//! Test utilities shared by the chunksync crates.
//!
//! This crate provides:
//! - Temporary file fixtures with deterministic contents
//! - Mutation helpers for building "slightly different" destinations
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use chunksync_testkit::prelude::*;
//!
//! let files = TestFiles::new();
//! let src = files.write("src.bin", &patterned(10_000, 7));
//! let dst = files.copy(&src, "dst.bin");
//! flip_byte(&dst, 4_100);
//! assert_ne!(files.read(&src), files.read(&dst));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
