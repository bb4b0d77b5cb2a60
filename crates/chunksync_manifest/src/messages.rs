//! Wire messages for the remote chunk primitives.
//!
//! Both primitives are `GET` requests against [`CHUNKS_ENDPOINT`] and are
//! told apart by the `method` query parameter.

use crate::chunk::ChunkDescriptor;
use crate::checksum::Checksum;
use crate::error::{ManifestError, ManifestResult};
use crate::manifest::Manifest;
use crate::query::{encode_query, QueryParams};
use serde::{Deserialize, Serialize};

/// Path of the chunk endpoint.
pub const CHUNKS_ENDPOINT: &str = "/api/v1/chunks";

/// `method` value for manifest retrieval.
pub const METHOD_CHUNK_META: &str = "getchunkmeta";

/// `method` value for raw chunk fetch.
pub const METHOD_CHUNK: &str = "getchunk";

/// Content type of JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Content type of raw chunk bodies.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// One chunk as it appears in a `getchunkmeta` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Byte offset of the chunk.
    pub offset: u64,
    /// Hex checksum of the chunk.
    pub checksum: String,
    /// Chunk length in bytes.
    pub len: u64,
}

impl From<&ChunkDescriptor> for ChunkMeta {
    fn from(desc: &ChunkDescriptor) -> Self {
        Self {
            offset: desc.offset,
            checksum: desc.checksum.to_hex(),
            len: desc.length,
        }
    }
}

impl TryFrom<&ChunkMeta> for ChunkDescriptor {
    type Error = ManifestError;

    fn try_from(meta: &ChunkMeta) -> ManifestResult<Self> {
        Ok(ChunkDescriptor::new(
            meta.offset,
            meta.len,
            Checksum::from_hex(&meta.checksum)?,
        ))
    }
}

/// Request for the manifest of a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetaRequest {
    /// Remote file path.
    pub path: String,
    /// Requested chunk size; `None` lets the server use its default.
    pub chunk_size: Option<u64>,
}

impl ChunkMetaRequest {
    /// Creates a request.
    pub fn new(path: impl Into<String>, chunk_size: Option<u64>) -> Self {
        Self {
            path: path.into(),
            chunk_size,
        }
    }

    /// Encodes the request as a query string.
    pub fn to_query(&self) -> String {
        let size = self.chunk_size.map(|s| s.to_string()).unwrap_or_default();
        encode_query(&[
            ("method", METHOD_CHUNK_META),
            ("path", &self.path),
            ("chunksize", &size),
        ])
    }

    /// Decodes a request from parsed query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] if `path` is missing or
    /// `chunksize` is not a number.
    pub fn from_query(params: &QueryParams) -> ManifestResult<Self> {
        Ok(Self {
            path: params.require("path")?.to_string(),
            chunk_size: params.parse_opt("chunksize")?,
        })
    }
}

/// Response to a `getchunkmeta` request.
///
/// A non-empty `err` means the call failed and `metas` is meaningless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetaResponse {
    /// Error message, empty on success.
    #[serde(default)]
    pub err: String,
    /// Path the manifest describes.
    #[serde(default)]
    pub path: String,
    /// Chunks in offset order.
    #[serde(default)]
    pub metas: Vec<ChunkMeta>,
}

impl ChunkMetaResponse {
    /// Creates a successful response for `manifest`.
    pub fn success(path: impl Into<String>, manifest: &Manifest) -> Self {
        Self {
            err: String::new(),
            path: path.into(),
            metas: manifest.iter().map(ChunkMeta::from).collect(),
        }
    }

    /// Creates an error response.
    pub fn error(path: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            err: err.into(),
            path: path.into(),
            metas: Vec::new(),
        }
    }

    /// Returns true if the response carries an error.
    pub fn is_error(&self) -> bool {
        !self.err.is_empty()
    }

    /// Converts the metas into a manifest built with `chunk_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidChecksum`] if any checksum is not
    /// valid hex.
    pub fn to_manifest(&self, chunk_size: u64) -> ManifestResult<Manifest> {
        let chunks = self
            .metas
            .iter()
            .map(ChunkDescriptor::try_from)
            .collect::<ManifestResult<Vec<_>>>()?;
        Ok(Manifest::from_chunks(chunk_size, chunks))
    }

    /// Encodes to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Codec`] if serialization fails.
    pub fn encode(&self) -> ManifestResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Codec`] on malformed input.
    pub fn decode(bytes: &[u8]) -> ManifestResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Request for a raw byte range of a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Remote file path.
    pub path: String,
    /// First byte to read.
    pub offset: u64,
    /// Number of bytes to read.
    pub length: u64,
}

impl ChunkRequest {
    /// Creates a request.
    pub fn new(path: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
        }
    }

    /// Encodes the request as a query string.
    ///
    /// The length travels as `chunksize`, matching the manifest request.
    pub fn to_query(&self) -> String {
        encode_query(&[
            ("method", METHOD_CHUNK),
            ("path", &self.path),
            ("offset", &self.offset.to_string()),
            ("chunksize", &self.length.to_string()),
        ])
    }

    /// Decodes a request from parsed query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] if any field is missing or
    /// not a number.
    pub fn from_query(params: &QueryParams) -> ManifestResult<Self> {
        Ok(Self {
            path: params.require("path")?.to_string(),
            offset: params.parse_required("offset")?,
            length: params.parse_required("chunksize")?,
        })
    }
}

/// Error body returned by a failed `getchunk` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub err: String,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(err: impl Into<String>) -> Self {
        Self { err: err.into() }
    }

    /// Encodes to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Codec`] if serialization fails.
    pub fn encode(&self) -> ManifestResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A transport-level response: status code, content type, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a `200 OK` response with a raw body.
    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_OCTET_STREAM.to_string(),
            body,
        }
    }

    /// Creates a JSON response with the given status.
    pub fn json(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON.to_string(),
            body,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Extracts the `err` field of a JSON error body, if there is one.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_slice::<ErrorResponse>(&self.body)
            .ok()
            .map(|e| e.err)
            .filter(|e| !e.is_empty())
    }
}
