//! Request handlers for the chunk endpoint.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::operation::{Operation, OperationOutput};
use chunksync_manifest::{
    ChunkMetaRequest, ChunkMetaResponse, ChunkRequest, ManifestBuilder, QueryParams,
};
use chunksync_storage::{FileBackend, StorageBackend};
use parking_lot::RwLock;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Counters for served requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Requests handled, successful or not.
    pub requests: u64,
    /// Requests that ended in an error.
    pub errors: u64,
    /// Raw chunk bytes sent.
    pub bytes_served: u64,
}

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    builder: ManifestBuilder,
    stats: RwLock<ServerStats>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            builder: ManifestBuilder::new(config.limits),
            config,
            stats: RwLock::new(ServerStats::default()),
        }
    }

    /// Returns a snapshot of the request counters.
    pub fn stats(&self) -> ServerStats {
        self.stats.read().clone()
    }

    pub(crate) fn record(&self, ok: bool, bytes: u64) {
        let mut stats = self.stats.write();
        stats.requests += 1;
        if !ok {
            stats.errors += 1;
        }
        stats.bytes_served += bytes;
    }

    /// Maps a request path onto a file under the configured root.
    ///
    /// Leading `/` and `.` components are dropped. Any `..` component is
    /// refused, and an existing path whose symlinks lead outside the root
    /// is refused as well. Missing paths resolve normally and fail when
    /// opened.
    pub fn resolve(&self, requested: &str) -> ServerResult<PathBuf> {
        let mut relative = PathBuf::new();
        for component in Path::new(requested).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir | Component::RootDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ServerError::Forbidden(requested.to_string()));
                }
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(ServerError::InvalidRequest(format!(
                "path {requested:?} names no file"
            )));
        }
        let joined = self.config.root.join(relative);
        if let Ok(real) = joined.canonicalize() {
            let root = self.config.root.canonicalize()?;
            if !real.starts_with(&root) {
                return Err(ServerError::Forbidden(requested.to_string()));
            }
        }
        Ok(joined)
    }
}

/// Executes chunk endpoint operations.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Runs `operation` with its parameters taken from `params`.
    pub fn execute(
        &self,
        operation: Operation,
        params: &QueryParams,
    ) -> ServerResult<OperationOutput> {
        match operation {
            Operation::ChunkMeta => {
                let request = ChunkMetaRequest::from_query(params)?;
                self.handle_chunk_meta(&request).map(OperationOutput::Manifest)
            }
            Operation::Chunk => {
                let request = ChunkRequest::from_query(params)?;
                self.handle_chunk(&request).map(OperationOutput::Bytes)
            }
        }
    }

    /// Builds the manifest of the requested file.
    ///
    /// An empty `chunksize` falls back to the configured default size.
    pub fn handle_chunk_meta(&self, request: &ChunkMetaRequest) -> ServerResult<ChunkMetaResponse> {
        let limits = &self.context.config.limits;
        let chunk_size = limits.resolve(request.chunk_size)?;
        let path = self.context.resolve(&request.path)?;

        let manifest = self.context.builder.build(&path, chunk_size)?;
        debug!(path = %request.path, chunk_size, chunks = manifest.len(), "served manifest");
        Ok(ChunkMetaResponse::success(request.path.clone(), &manifest))
    }

    /// Reads the requested byte range.
    ///
    /// The length must be within the chunk size bounds and the range must lie
    /// inside the file.
    pub fn handle_chunk(&self, request: &ChunkRequest) -> ServerResult<Vec<u8>> {
        let limits = &self.context.config.limits;
        if request.length == 0 || request.length > limits.max {
            return Err(ServerError::BadChunkSize {
                size: request.length,
                min: 1,
                max: limits.max,
            });
        }

        let path = self.context.resolve(&request.path)?;
        let backend = FileBackend::open_read_only(&path)?;
        let data = backend.read_at(request.offset, request.length as usize)?;
        debug!(path = %request.path, offset = request.offset, length = data.len(), "served chunk");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunksync_manifest::{Checksum, ChunkSizeLimits};
    use tempfile::TempDir;

    fn create_handler() -> (TempDir, Arc<HandlerContext>, RequestHandler) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"0123456789").unwrap();
        let config = ServerConfig::new(dir.path()).with_limits(ChunkSizeLimits::new(2, 8));
        let context = Arc::new(HandlerContext::new(config));
        let handler = RequestHandler::new(Arc::clone(&context));
        (dir, context, handler)
    }

    #[test]
    fn resolve_stays_under_root() {
        let (dir, context, _) = create_handler();
        assert_eq!(context.resolve("/a.bin").unwrap(), dir.path().join("a.bin"));
        assert_eq!(
            context.resolve("./sub/./b.bin").unwrap(),
            dir.path().join("sub/b.bin")
        );
        assert!(matches!(
            context.resolve("/../etc/passwd"),
            Err(ServerError::Forbidden(_))
        ));
        assert!(matches!(
            context.resolve("sub/../../x"),
            Err(ServerError::Forbidden(_))
        ));
        assert!(matches!(
            context.resolve("/"),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let (dir, context, _) = create_handler();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.bin"), b"secret").unwrap();

        std::os::unix::fs::symlink(outside.path().join("secret.bin"), dir.path().join("leak.bin"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("out")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.bin"), dir.path().join("alias.bin")).unwrap();

        assert!(matches!(
            context.resolve("/leak.bin"),
            Err(ServerError::Forbidden(_))
        ));
        assert!(matches!(
            context.resolve("/out/secret.bin"),
            Err(ServerError::Forbidden(_))
        ));
        assert_eq!(
            context.resolve("/alias.bin").unwrap(),
            dir.path().join("alias.bin")
        );
    }

    #[test]
    fn chunk_meta() {
        let (_dir, _, handler) = create_handler();
        let response = handler
            .handle_chunk_meta(&ChunkMetaRequest::new("/a.bin", Some(4)))
            .unwrap();

        assert_eq!(response.path, "/a.bin");
        assert_eq!(response.metas.len(), 3);
        assert_eq!(response.metas[2].offset, 8);
        assert_eq!(response.metas[2].len, 2);
        assert_eq!(response.metas[0].checksum, Checksum::compute(b"0123").to_hex());
    }

    #[test]
    fn chunk_meta_default_size() {
        let (_dir, _, handler) = create_handler();
        let response = handler
            .handle_chunk_meta(&ChunkMetaRequest::new("/a.bin", None))
            .unwrap();
        // default clamps to the 8-byte max
        assert_eq!(response.metas.len(), 2);
        assert_eq!(response.metas[0].len, 8);
    }

    #[test]
    fn chunk_meta_rejects_bad_size() {
        let (_dir, _, handler) = create_handler();
        let err = handler
            .handle_chunk_meta(&ChunkMetaRequest::new("/a.bin", Some(64)))
            .unwrap_err();
        assert!(matches!(err, ServerError::BadChunkSize { size: 64, .. }));
    }

    #[test]
    fn chunk_meta_missing_file() {
        let (_dir, _, handler) = create_handler();
        let err = handler
            .handle_chunk_meta(&ChunkMetaRequest::new("/missing.bin", Some(4)))
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn chunk_range() {
        let (_dir, _, handler) = create_handler();
        let data = handler.handle_chunk(&ChunkRequest::new("/a.bin", 4, 4)).unwrap();
        assert_eq!(data, b"4567");
        let tail = handler.handle_chunk(&ChunkRequest::new("/a.bin", 8, 2)).unwrap();
        assert_eq!(tail, b"89");
    }

    #[test]
    fn chunk_range_past_end() {
        let (_dir, _, handler) = create_handler();
        let err = handler
            .handle_chunk(&ChunkRequest::new("/a.bin", 8, 4))
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn chunk_length_bounds() {
        let (_dir, _, handler) = create_handler();
        for length in [0, 9] {
            let err = handler
                .handle_chunk(&ChunkRequest::new("/a.bin", 0, length))
                .unwrap_err();
            assert!(matches!(err, ServerError::BadChunkSize { .. }));
        }
    }

    #[test]
    fn execute_dispatches_by_operation() {
        let (_dir, _, handler) = create_handler();
        let params = QueryParams::parse("path=/a.bin&offset=0&chunksize=2").unwrap();
        assert_eq!(
            handler.execute(Operation::Chunk, &params).unwrap(),
            OperationOutput::Bytes(b"01".to_vec())
        );

        let missing = QueryParams::parse("offset=0&chunksize=2").unwrap();
        let err = handler.execute(Operation::Chunk, &missing).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
