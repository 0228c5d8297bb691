//! Intercepted request
//!
//! A request captured from the client, resolved to an absolute URL.

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::Method;
use bytes::Bytes;
use url::Url;

use crate::cache::{CacheKey, MAX_BODY_SIZE};
use crate::error::{CacheError, Result};
use crate::fetch::is_hop_by_hop;

/// A client request on its way through the caching layer.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// End-to-end request headers
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A bodiless GET, as issued for manifest assets.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Store key, present only for GET.
    pub fn key(&self) -> Option<CacheKey> {
        CacheKey::for_request(&self.method, &self.url)
    }

    // == From HTTP ==
    /// Converts an incoming server request.
    ///
    /// Absolute-form targets (`GET http://host/path`) keep their URL;
    /// origin-form targets are resolved against `origin`.
    pub async fn from_http(request: Request, origin: &Url) -> Result<Self> {
        let (parts, body) = request.into_parts();

        let url = if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
            Url::parse(&parts.uri.to_string())
                .map_err(|e| CacheError::InvalidRequest(format!("invalid request target: {}", e)))?
        } else {
            // Path and query only; a `//host/..` path must not replace the origin's host
            let mut url = origin.clone();
            url.set_path(parts.uri.path());
            url.set_query(parts.uri.query());
            url
        };

        let headers = parts
            .headers
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = to_bytes(body, MAX_BODY_SIZE)
            .await
            .map_err(|e| CacheError::InvalidRequest(format!("unreadable request body: {}", e)))?;

        Ok(Self {
            method: parts.method,
            url,
            headers,
            body,
        })
    }
}
