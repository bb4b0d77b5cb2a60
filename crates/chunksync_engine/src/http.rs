//! HTTP chunk source.
//!
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, an in-process loopback, etc.).

use crate::error::{SyncError, SyncResult};
use crate::transport::ChunkSource;
use chunksync_manifest::{
    ChunkMetaRequest, ChunkMetaResponse, ChunkRequest, HttpResponse, Manifest, CHUNKS_ENDPOINT,
};
use parking_lot::RwLock;
use tracing::debug;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err` means
/// no response was received at all; any received status is an `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response.
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// A remote source file served over the chunk endpoint.
pub struct HttpSource<C: HttpClient> {
    /// Base URL of the server (e.g., "https://files.example.com").
    base_url: String,
    /// Path of the file on the server.
    path: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpSource<C> {
    /// Creates a source for `path` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Creates a source from a full URL like `http://host:8080/data/a.bin`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Protocol`] if the URL has no scheme, host, or
    /// path.
    pub fn from_url(url: &str, client: C) -> SyncResult<Self> {
        let (base, path) = split_url(url)
            .ok_or_else(|| SyncError::Protocol(format!("not a file URL: {url}")))?;
        Ok(Self::new(base, path, client))
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the remote file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn get(&self, query: &str) -> SyncResult<HttpResponse> {
        let url = format!("{}{}?{}", self.base_url, CHUNKS_ENDPOINT, query);
        debug!(%url, "GET");

        let response = self.client.get(&url).map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::network_retryable(e)
        })?;
        *self.last_error.write() = None;

        if response.is_success() {
            return Ok(response);
        }
        if response.status == 404 {
            return Err(SyncError::PathNotFound {
                path: self.locator(),
            });
        }
        Err(SyncError::Remote {
            status: response.status,
            message: response
                .error_message()
                .unwrap_or_else(|| format!("HTTP status {}", response.status)),
        })
    }
}

impl<C: HttpClient> ChunkSource for HttpSource<C> {
    fn locator(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    fn manifest(&self, chunk_size: u64) -> SyncResult<Manifest> {
        let request = ChunkMetaRequest::new(self.path.clone(), Some(chunk_size));
        let response = self.get(&request.to_query())?;

        let meta = ChunkMetaResponse::decode(&response.body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode manifest: {e}")))?;
        if meta.is_error() {
            return Err(SyncError::Remote {
                status: response.status,
                message: meta.err,
            });
        }

        let mut manifest = meta.to_manifest(chunk_size)?;
        manifest.sort_by_offset();
        manifest
            .validate()
            .map_err(|e| SyncError::Protocol(format!("remote manifest rejected: {e}")))?;
        Ok(manifest)
    }

    fn fetch(&self, offset: u64, length: u64) -> SyncResult<Vec<u8>> {
        let request = ChunkRequest::new(self.path.clone(), offset, length);
        Ok(self.get(&request.to_query())?.body)
    }
}

/// Splits `scheme://host[:port]/path` into `("scheme://host[:port]", "/path")`.
fn split_url(url: &str) -> Option<(&str, &str)> {
    let scheme_end = url.find("://")? + 3;
    let path_start = scheme_end + url[scheme_end..].find('/')?;
    if path_start == scheme_end || path_start + 1 == url.len() {
        return None;
    }
    Some((&url[..path_start], &url[path_start..]))
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a GET for a request target like `/api/v1/chunks?...`.
    fn handle_get(&self, path_and_query: &str) -> HttpResponse;
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let target = url
            .find(CHUNKS_ENDPOINT)
            .map(|i| &url[i..])
            .ok_or_else(|| format!("no route for {url}"))?;
        Ok(self.server.handle_get(target))
    }
}
