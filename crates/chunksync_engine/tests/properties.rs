//! Property tests: any destination converges to the source.

use chunksync_engine::{LocalSource, SyncConfig, SyncEngine};
use chunksync_manifest::{ChunkSizeLimits, ManifestBuilder};
use chunksync_testkit::prelude::*;
use proptest::prelude::*;

fn limits() -> ChunkSizeLimits {
    ChunkSizeLimits::new(1, 1024)
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn sync_converges_and_is_idempotent(
        (source, destination) in related_pair_strategy(600),
        chunk_size in chunk_size_strategy(),
        workers in 1usize..4,
    ) {
        let files = TestFiles::new();
        let src = files.write("src.bin", &source);
        let dst = files.write("dst.bin", &destination);

        let engine = SyncEngine::new(
            SyncConfig::new()
                .with_limits(limits())
                .with_workers(workers)
                .with_sync_on_finish(false),
        );
        let local = LocalSource::open(&src).unwrap().with_limits(limits());

        engine.sync(&local, &dst, chunk_size).unwrap();
        prop_assert_eq!(files.read(&dst), source);

        let builder = ManifestBuilder::new(limits());
        prop_assert_eq!(
            builder.build(&dst, chunk_size).unwrap(),
            builder.build(&src, chunk_size).unwrap()
        );

        let rerun = engine.sync(&local, &dst, chunk_size).unwrap();
        prop_assert_eq!(rerun.chunks_transferred, 0);
    }
}
