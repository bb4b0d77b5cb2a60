//! Manifest diffing.

use crate::chunk::ChunkDescriptor;
use crate::manifest::Manifest;
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;

/// The source chunks a destination needs, in offset order.
///
/// A plan with no chunks and no truncation means the destination already
/// matches the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    chunks: Vec<ChunkDescriptor>,
    source_size: u64,
    truncate_to: Option<u64>,
}

impl SyncPlan {
    /// Returns the chunks to transfer.
    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    /// Returns an iterator over the chunks to transfer.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkDescriptor> {
        self.chunks.iter()
    }

    /// Returns the number of chunks to transfer.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if there is nothing to transfer and nothing to truncate.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.truncate_to.is_none()
    }

    /// Returns the size of the source file.
    pub fn source_size(&self) -> u64 {
        self.source_size
    }

    /// Returns the length the destination must be cut to, if it is longer
    /// than the source.
    pub fn truncate_to(&self) -> Option<u64> {
        self.truncate_to
    }

    /// Returns the number of bytes the plan transfers.
    pub fn transfer_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.length).sum()
    }
}

/// Computes the chunks of `source` that `destination` lacks.
///
/// `destination` is `None` when the destination file does not exist, in
/// which case every source chunk is planned. Otherwise the two manifests are
/// merged by offset:
///
/// - a source offset with no destination counterpart is planned
/// - matching offsets are planned only when the chunks differ
/// - destination offsets with no source counterpart are skipped
///
/// Source chunks left over once the destination is exhausted (a grown tail)
/// are all planned. A destination longer than the source yields
/// [`SyncPlan::truncate_to`].
///
/// Both manifests must be built with the same chunk size. They are sorted
/// by offset here if they are not already.
pub fn diff(source: &Manifest, destination: Option<&Manifest>) -> SyncPlan {
    let source_size = source.total_size();

    let Some(destination) = destination else {
        return SyncPlan {
            chunks: source.chunks().to_vec(),
            source_size,
            truncate_to: None,
        };
    };

    let truncate_to = (destination.total_size() > source_size).then_some(source_size);

    if source.is_empty() {
        return SyncPlan {
            chunks: Vec::new(),
            source_size,
            truncate_to,
        };
    }

    let src = sorted(source);
    let dst = sorted(destination);

    let mut chunks = Vec::with_capacity(src.len());
    let mut src_idx = 0;
    let mut dst_idx = 0;

    while src_idx < src.len() && dst_idx < dst.len() {
        let s = &src[src_idx];
        let d = &dst[dst_idx];

        match s.offset.cmp(&d.offset) {
            Ordering::Less => {
                chunks.push(*s);
                src_idx += 1;
            }
            Ordering::Greater => {
                dst_idx += 1;
            }
            Ordering::Equal => {
                if s.checksum != d.checksum || s.length != d.length {
                    chunks.push(*s);
                }
                src_idx += 1;
                dst_idx += 1;
            }
        }
    }

    chunks.extend_from_slice(&src[src_idx..]);

    SyncPlan {
        chunks,
        source_size,
        truncate_to,
    }
}

fn sorted(manifest: &Manifest) -> Cow<'_, [ChunkDescriptor]> {
    if manifest.is_sorted() {
        Cow::Borrowed(manifest.chunks())
    } else {
        let mut chunks = manifest.chunks().to_vec();
        chunks.sort_by_key(|c| c.offset);
        Cow::Owned(chunks)
    }
}
