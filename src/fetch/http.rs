//! HTTP Fetcher
//!
//! reqwest-backed network access. Redirects are returned to the caller
//! rather than followed. Response bodies larger than the configured limit
//! are rejected without being buffered in full.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{redirect, Client};
use tracing::debug;

use crate::cache::{StoredResponse, MAX_BODY_SIZE};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetch::{is_hop_by_hop, Fetcher};
use crate::models::InterceptedRequest;

// == HTTP Fetcher ==
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_size: usize,
}

impl HttpFetcher {
    /// Builds a client. `timeout` of `None` waits for the network indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("offline_cache/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = (config.fetch_timeout > 0).then(|| Duration::from_secs(config.fetch_timeout));
        Self::new(timeout)
    }

    /// Wraps a preconfigured client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_size: MAX_BODY_SIZE,
        }
    }

    /// Overrides the response body limit (default `MAX_BODY_SIZE`).
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    fn too_large(&self, request: &InterceptedRequest, len: u64) -> CacheError {
        CacheError::ResponseTooLarge(format!(
            "{}: {} bytes exceeds {}",
            request.url, len, self.max_body_size
        ))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| CacheError::Fetch(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        if let Some(len) = response.content_length() {
            if len > self.max_body_size as u64 {
                return Err(self.too_large(request, len));
            }
        }

        // Chunked bodies carry no length up front
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CacheError::Fetch(format!("{}: body read failed: {}", request.url, e)))?
        {
            if body.len() + chunk.len() > self.max_body_size {
                return Err(self.too_large(request, (body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();

        debug!(url = %request.url, status, bytes = body.len(), "Network response");
        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}
