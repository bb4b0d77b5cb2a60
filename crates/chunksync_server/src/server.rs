//! Main chunk server.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::{HandlerContext, RequestHandler, ServerStats};
use crate::operation::{Operation, OperationOutput};
use chunksync_manifest::{
    split_target, ChunkMetaResponse, ErrorResponse, HttpResponse, QueryParams, CHUNKS_ENDPOINT,
};
use std::sync::Arc;
use tracing::{error, warn};

/// The chunk server.
///
/// Answers `GET /api/v1/chunks` requests for files under a root directory.
/// It is transport-agnostic: an HTTP layer passes in the request target and
/// writes back the returned status, content type, and body.
///
/// # Example
///
/// ```
/// use chunksync_server::{ChunkServer, ServerConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.bin"), b"hello").unwrap();
///
/// let server = ChunkServer::new(ServerConfig::new(dir.path()));
/// let response = server.handle_get("/api/v1/chunks?method=getchunk&path=/a.bin&offset=1&chunksize=3");
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, b"ell");
/// ```
pub struct ChunkServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl ChunkServer {
    /// Creates a new chunk server.
    pub fn new(config: ServerConfig) -> Self {
        let context = Arc::new(HandlerContext::new(config));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the request counters.
    pub fn stats(&self) -> ServerStats {
        self.context.stats()
    }

    /// Handles a GET for a request target like `/api/v1/chunks?method=...`.
    pub fn handle_get(&self, path_and_query: &str) -> HttpResponse {
        let (path, query) = split_target(path_and_query);
        if path != CHUNKS_ENDPOINT {
            self.context.record(false, 0);
            return error_response(None, &ServerError::NotFound(path.to_string()));
        }

        let params = match QueryParams::parse(query) {
            Ok(params) => params,
            Err(e) => {
                self.context.record(false, 0);
                return error_response(None, &e.into());
            }
        };

        let method = params.get("method").unwrap_or_default();
        let Some(operation) = Operation::lookup(method) else {
            self.context.record(false, 0);
            return error_response(None, &ServerError::UnknownMethod(method.to_string()));
        };

        match self.handler.execute(operation, &params) {
            Ok(OperationOutput::Bytes(data)) => {
                self.context.record(true, data.len() as u64);
                HttpResponse::bytes(data)
            }
            Ok(OperationOutput::Manifest(response)) => {
                self.context.record(true, 0);
                match response.encode() {
                    Ok(body) => HttpResponse::json(200, body),
                    Err(e) => {
                        error!(error = %e, "failed to encode manifest response");
                        error_response(None, &ServerError::Internal(e.to_string()))
                    }
                }
            }
            Err(e) => {
                self.context.record(false, 0);
                let path = (operation == Operation::ChunkMeta)
                    .then(|| params.get("path").unwrap_or_default());
                error_response(path, &e)
            }
        }
    }
}

/// Builds a JSON error response.
///
/// Manifest requests get the full `{err, path, metas}` shape; everything
/// else gets `{err}`.
fn error_response(meta_path: Option<&str>, err: &ServerError) -> HttpResponse {
    let status = err.status();
    if err.is_server_error() {
        error!(status, error = %err, "request failed");
    } else {
        warn!(status, error = %err, "request rejected");
    }

    let body = match meta_path {
        Some(path) => ChunkMetaResponse::error(path, err.to_string()).encode(),
        None => ErrorResponse::new(err.to_string()).encode(),
    };
    match body {
        Ok(body) => HttpResponse::json(status, body),
        Err(_) => HttpResponse {
            status: 500,
            content_type: "text/plain".to_string(),
            body: err.to_string().into_bytes(),
        },
    }
}
