//! Blocking `reqwest` client for remote sources.

use chunksync_engine::HttpClient;
use chunksync_manifest::HttpResponse;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// [`HttpClient`] backed by `reqwest::blocking`.
///
/// Must be created and used off the async runtime's worker threads.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("chunksync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
