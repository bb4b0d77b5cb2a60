//! Integration tests for the sync engine, local and over a loopback server.

use chunksync_engine::{
    with_retry, ChunkSource, HttpSource, LocalSource, LoopbackClient, LoopbackServer, MockSource,
    RetryConfig, SyncConfig, SyncEngine, SyncError, SyncResult,
};
use chunksync_manifest::{ChunkDescriptor, ChunkSizeLimits, HttpResponse, Manifest, ManifestBuilder};
use chunksync_server::{ChunkServer, ServerConfig};
use chunksync_testkit::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Routes loopback requests into an in-process chunk server.
struct InProcessServer(Arc<ChunkServer>);

impl LoopbackServer for InProcessServer {
    fn handle_get(&self, path_and_query: &str) -> HttpResponse {
        self.0.handle_get(path_and_query)
    }
}

fn small_limits() -> ChunkSizeLimits {
    ChunkSizeLimits::new(16, 64 * 1024)
}

fn engine() -> SyncEngine {
    SyncEngine::new(SyncConfig::new().with_limits(small_limits()))
}

fn local(path: &Path) -> LocalSource {
    LocalSource::open(path).unwrap().with_limits(small_limits())
}

fn assert_same_manifest(src: &Path, dst: &Path, chunk_size: u64) {
    let builder = ManifestBuilder::new(small_limits());
    assert_eq!(
        builder.build(src, chunk_size).unwrap(),
        builder.build(dst, chunk_size).unwrap()
    );
}

#[test]
fn one_changed_chunk_in_ten_mib() {
    let files = TestFiles::new();
    let data = patterned(10 * MIB as usize, 42);
    let src = files.write("src.bin", &data);
    let dst = files.write("dst.bin", &data);
    flip_byte(&dst, 4 * MIB + 123);

    let engine = SyncEngine::new(SyncConfig::default());
    let source = LocalSource::open(&src).unwrap();

    let manifest = source.manifest(4 * MIB).unwrap();
    let lengths: Vec<u64> = manifest.iter().map(|c| c.length).collect();
    assert_eq!(lengths, vec![4 * MIB, 4 * MIB, 2 * MIB]);

    let report = engine.sync(&source, &dst, 4 * MIB).unwrap();
    assert_eq!(report.chunks_transferred, 1);
    assert_eq!(report.bytes_transferred, 4 * MIB);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn missing_destination_is_created() {
    let files = TestFiles::new();
    let data = patterned(5000, 1);
    let src = files.write("src.bin", &data);
    let dst = files.path("out/dst.bin");

    let report = engine().sync(&local(&src), &dst, 1024).unwrap();
    assert!(report.created);
    assert_eq!(report.chunks_transferred, 5);
    assert_eq!(files.read(&dst), data);
    assert_same_manifest(&src, &dst, 1024);
}

#[test]
fn larger_destination_is_truncated() {
    let files = TestFiles::new();
    let data = patterned(3072, 2);
    let src = files.write("src.bin", &data);
    let dst = files.write("dst.bin", &data);
    append(&dst, &[9u8; 5000]);

    let report = engine().sync(&local(&src), &dst, 1024).unwrap();
    assert!(report.truncated);
    assert_eq!(report.chunks_transferred, 0);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn truncation_with_changed_last_chunk() {
    let files = TestFiles::new();
    let data = patterned(2500, 3);
    let src = files.write("src.bin", &data);
    let mut longer = data.clone();
    longer.extend_from_slice(&patterned(700, 4));
    let dst = files.write("dst.bin", &longer);

    // chunk at 2048 is 452 bytes in the source but 1024 in the destination
    let report = engine().sync(&local(&src), &dst, 1024).unwrap();
    assert_eq!(report.chunks_transferred, 1);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn grown_source_tail_is_transferred() {
    let files = TestFiles::new();
    let data = patterned(10_000, 5);
    let src = files.write("src.bin", &data);
    let dst = files.write("dst.bin", &data[..2_100]);

    let report = engine().sync(&local(&src), &dst, 1024).unwrap();
    // chunk 2 was partial; chunks 3..=9 are new
    assert_eq!(report.chunks_transferred, 8);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn rerun_transfers_nothing() {
    let files = TestFiles::new();
    let (src, dst) = scenarios::modified_pair(&files, 20_000, &[10, 9_000, 19_999]);
    let engine = engine();
    let source = local(&src);

    let first = engine.sync(&source, &dst, 2048).unwrap();
    assert_eq!(first.chunks_transferred, 3);

    let second = engine.sync(&source, &dst, 2048).unwrap();
    assert_eq!(second.chunks_transferred, 0);
    assert!(second.is_noop());
    assert_same_manifest(&src, &dst, 2048);
}

#[test]
fn empty_source_empties_destination() {
    let files = TestFiles::new();
    let src = files.write("src.bin", b"");
    let dst = files.write("dst.bin", &patterned(3000, 6));

    let report = engine().sync(&local(&src), &dst, 1024).unwrap();
    assert!(report.truncated);
    assert_eq!(files.read(&dst).len(), 0);
}

#[test]
fn failure_reports_progress_and_rerun_finishes() {
    let files = TestFiles::new();
    let data = patterned(8 * 1024, 7);
    let dst = files.write("dst.bin", &vec![0u8; data.len()]);
    let source = MockSource::new(data.clone());
    source.fail_after(3);

    let engine = engine();
    let failure = engine.sync(&source, &dst, 1024).unwrap_err();
    assert!(failure.is_retryable());
    assert_eq!(failure.chunks_applied, 3);
    assert_eq!(failure.bytes_applied, 3 * 1024);
    // applied chunks are kept
    assert_eq!(&files.read(&dst)[..3 * 1024], &data[..3 * 1024]);

    source.clear_failure();
    let report = engine.sync(&source, &dst, 1024).unwrap();
    assert_eq!(report.chunks_transferred, 5);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn retry_helper_resumes_failed_sync() {
    let files = TestFiles::new();
    let data = patterned(6 * 1024, 8);
    let dst = files.path("dst.bin");
    let source = MockSource::new(data.clone());
    source.fail_after(2);

    let engine = engine();
    let retry = RetryConfig::new(3)
        .with_initial_delay(Duration::from_millis(1))
        .with_jitter(false);
    let report = with_retry(&retry, |attempt| {
        if attempt > 0 {
            source.clear_failure();
        }
        engine.sync(&source, &dst, 1024)
    })
    .unwrap();

    assert_eq!(report.chunks_transferred, 4);
    assert_eq!(files.read(&dst), data);
    assert_eq!(engine.stats().syncs_failed, 1);
}

#[test]
fn cancel_stops_before_next_chunk() {
    let files = TestFiles::new();
    let data = patterned(8 * 1024, 9);
    let dst = files.path("dst.bin");
    let source = MockSource::new(data.clone());

    let engine = engine();
    let token = engine.cancel_token();
    source.on_fetch(move |offset| {
        if offset == 2 * 1024 {
            token.cancel();
        }
    });

    let failure = engine.sync(&source, &dst, 1024).unwrap_err();
    assert!(matches!(failure.error, SyncError::Canceled));
    assert_eq!(failure.chunks_applied, 3);

    // the flag stays set until reset
    assert!(matches!(
        engine.sync(&source, &dst, 1024).unwrap_err().error,
        SyncError::Canceled
    ));

    engine.reset_cancel();
    source.on_fetch(|_| {});
    let report = engine.sync(&source, &dst, 1024).unwrap();
    assert_eq!(report.chunks_transferred, 5);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn parallel_workers_match_sequential() {
    let files = TestFiles::new();
    let data = patterned(300_000, 10);
    let src = files.write("src.bin", &data);
    let mut stale = data.clone();
    flip_bytes(&mut stale, &[0, 50_000, 150_000, 299_999]);
    let dst = files.write("dst.bin", &stale[..200_000]);

    let engine = SyncEngine::new(
        SyncConfig::new()
            .with_limits(small_limits())
            .with_workers(4)
            .with_verify_writes(true),
    );
    let report = engine.sync(&local(&src), &dst, 4096).unwrap();

    // changed chunks 0, 12 and 36, partial chunk 48, tail chunks 49..=73
    assert_eq!(report.chunks_transferred, 3 + 1 + 25);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn parallel_failure_stops_claiming() {
    let files = TestFiles::new();
    let data = patterned(64 * 1024, 11);
    let dst = files.path("dst.bin");
    let source = MockSource::new(data);
    source.fail_after(4);

    let engine = SyncEngine::new(SyncConfig::new().with_limits(small_limits()).with_workers(3));
    let failure = engine.sync(&source, &dst, 1024).unwrap_err();
    assert!(failure.is_retryable());
    assert_eq!(failure.chunks_applied, 4);
}

#[test]
fn http_source_over_loopback() {
    let files = TestFiles::new();
    let data = patterned(50_000, 12);
    files.write("served/data/src.bin", &data);
    let dst = files.write("dst.bin", &data[..30_000]);
    flip_byte(&dst, 5_000);

    let server = Arc::new(ChunkServer::new(
        ServerConfig::new(files.path("served")).with_limits(small_limits()),
    ));
    let client = LoopbackClient::new(InProcessServer(Arc::clone(&server)));
    let source = HttpSource::from_url("http://files.local/data/src.bin", client).unwrap();

    let report = engine().sync(&source, &dst, 4096).unwrap();
    // chunk 1 was flipped, chunk 7 partial, chunks 8..=12 new
    assert_eq!(report.chunks_transferred, 7);
    assert_eq!(files.read(&dst), data);
    assert_eq!(server.stats().bytes_served, report.bytes_transferred);
}

#[test]
fn http_and_local_sources_agree() {
    let files = TestFiles::new();
    let data = patterned(40_000, 13);
    let src = files.write("served/src.bin", &data);

    let server = ChunkServer::new(ServerConfig::new(files.path("served")).with_limits(small_limits()));
    let client = LoopbackClient::new(InProcessServer(Arc::new(server)));
    let remote = HttpSource::new("http://files.local", "/src.bin", client);

    assert_eq!(remote.manifest(2048).unwrap(), local(&src).manifest(2048).unwrap());
}

#[test]
fn http_errors_map_to_typed_errors() {
    let files = TestFiles::new();
    files.write("served/src.bin", b"hello");
    let server = Arc::new(ChunkServer::new(
        ServerConfig::new(files.path("served")).with_limits(small_limits()),
    ));

    let missing = HttpSource::new(
        "http://files.local",
        "/nope.bin",
        LoopbackClient::new(InProcessServer(Arc::clone(&server))),
    );
    let failure = engine().sync(&missing, &files.path("dst.bin"), 1024).unwrap_err();
    assert!(matches!(failure.error, SyncError::PathNotFound { .. }));

    let escape = HttpSource::new(
        "http://files.local",
        "/../secret.bin",
        LoopbackClient::new(InProcessServer(Arc::clone(&server))),
    );
    assert!(matches!(
        escape.manifest(1024),
        Err(SyncError::Remote { status: 403, .. })
    ));

    // the server's limits are narrower than what the client asks for
    let strict = Arc::new(ChunkServer::new(
        ServerConfig::new(files.path("served")).with_limits(ChunkSizeLimits::new(16, 32)),
    ));
    let source = HttpSource::new(
        "http://files.local",
        "/src.bin",
        LoopbackClient::new(InProcessServer(strict)),
    );
    assert!(matches!(
        source.manifest(1024),
        Err(SyncError::Remote { status: 400, .. })
    ));
}

/// A source whose served bytes or layout disagree with its manifest.
struct Inconsistent {
    manifest: Manifest,
    data: Vec<u8>,
}

impl ChunkSource for Inconsistent {
    fn locator(&self) -> String {
        "inconsistent://source".to_string()
    }

    fn manifest(&self, _chunk_size: u64) -> SyncResult<Manifest> {
        Ok(self.manifest.clone())
    }

    fn fetch(&self, offset: u64, length: u64) -> SyncResult<Vec<u8>> {
        let start = offset as usize;
        Ok(self.data[start..start + length as usize].to_vec())
    }
}

#[test]
fn reused_local_source_follows_growth() {
    let files = TestFiles::new();
    let data = patterned(8192, 14);
    let src = files.write("src.bin", &data[..4096]);
    let dst = files.path("dst.bin");

    let engine = engine();
    let source = local(&src);
    assert_eq!(engine.sync(&source, &dst, 1024).unwrap().chunks_transferred, 4);

    files.write("src.bin", &data);
    let report = engine.sync(&source, &dst, 1024).unwrap();
    assert_eq!(report.chunks_transferred, 4);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn engine_opens_local_source_with_its_limits() {
    let files = TestFiles::new();
    let data = patterned(3000, 15);
    let src = files.write("src.bin", &data);
    let dst = files.path("dst.bin");

    // 1024 is below the default 4 KiB minimum
    assert!(LocalSource::open(&src).unwrap().manifest(1024).is_err());

    let engine = engine();
    let source = engine.open_local(&src).unwrap();
    let report = engine.sync(&source, &dst, 1024).unwrap();
    assert_eq!(report.chunks_transferred, 3);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn destination_is_sized_before_first_write() {
    let files = TestFiles::new();
    let data = patterned(5000, 16);
    let dst = files.path("out/dst.bin");
    let source = MockSource::new(data.clone());

    let seen = Arc::new(AtomicU64::new(u64::MAX));
    let observed = Arc::clone(&seen);
    let path = dst.clone();
    source.on_fetch(move |offset| {
        if offset == 0 {
            let len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            observed.store(len, Ordering::SeqCst);
        }
    });

    engine().sync(&source, &dst, 1024).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5000);
    assert_eq!(files.read(&dst), data);
}

#[test]
fn verify_catches_bytes_that_disagree_with_manifest() {
    let files = TestFiles::new();
    let dst = files.path("dst.bin");
    let builder = ManifestBuilder::new(small_limits());
    let source = Inconsistent {
        manifest: builder.build_from_reader(&patterned(1024, 17)[..], 1024).unwrap(),
        data: patterned(1024, 18),
    };

    let engine = SyncEngine::new(
        SyncConfig::new()
            .with_limits(small_limits())
            .with_verify_writes(true),
    );
    let failure = engine.sync(&source, &dst, 1024).unwrap_err();
    assert!(matches!(
        failure.error,
        SyncError::ChecksumMismatchAfterWrite { offset: 0, .. }
    ));
    assert!(!failure.is_retryable());
    assert_eq!(failure.chunks_applied, 0);
}

#[test]
fn gapped_manifest_fails_size_check() {
    let files = TestFiles::new();
    let dst = files.path("dst.bin");
    let data = patterned(3072, 19);
    // chunks at 0 and 2048 sum to 2048 bytes but end at 3072
    let manifest = Manifest::from_chunks(
        1024,
        vec![
            ChunkDescriptor::for_data(0, &data[..1024]),
            ChunkDescriptor::for_data(2048, &data[2048..]),
        ],
    );
    let source = Inconsistent { manifest, data };

    let failure = engine().sync(&source, &dst, 1024).unwrap_err();
    assert!(matches!(
        failure.error,
        SyncError::SizeMismatchAfterSync {
            expected: 2048,
            actual: 3072
        }
    ));
    assert_eq!(failure.chunks_applied, 2);
}
