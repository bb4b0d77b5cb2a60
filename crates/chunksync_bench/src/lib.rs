//! Benchmark utilities.

use chunksync_manifest::{Checksum, ChunkDescriptor, Manifest};
use rand::Rng;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Returns a copy of `data` with one byte flipped every `stride` bytes.
pub fn mutate_every(data: &[u8], stride: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] ^= 0xFF;
    }
    out
}

/// Builds a manifest of `count` full chunks with random checksums.
pub fn synthetic_manifest(count: usize, chunk_size: u64) -> Manifest {
    let chunks = (0..count as u64)
        .map(|i| ChunkDescriptor::new(i * chunk_size, chunk_size, random_checksum()))
        .collect();
    Manifest::from_chunks(chunk_size, chunks)
}

/// Returns a copy of `manifest` where a random `ratio` of chunks changed.
pub fn perturb(manifest: &Manifest, ratio: f64) -> Manifest {
    let mut rng = rand::thread_rng();
    let chunks = manifest
        .iter()
        .map(|c| {
            if rng.gen_bool(ratio) {
                ChunkDescriptor::new(c.offset, c.length, random_checksum())
            } else {
                *c
            }
        })
        .collect();
    Manifest::from_chunks(manifest.chunk_size(), chunks)
}

fn random_checksum() -> Checksum {
    Checksum::from_bytes(rand::thread_rng().gen())
}
