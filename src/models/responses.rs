//! Response DTOs for the caching proxy
//!
//! Control endpoint bodies and the conversion of served responses into
//! HTTP responses.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::control::ControlMessage;
use crate::fetch::is_hop_by_hop;
use crate::lifecycle::RegistrationStatus;
use crate::policy::Served;

/// Header naming where a proxied response came from
pub const CACHE_SOURCE_HEADER: &str = "x-cache-source";

// == Served ==
impl IntoResponse for Served {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.response.status).unwrap_or(StatusCode::BAD_GATEWAY);

        let mut response = Response::new(Body::from(self.response.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.response.headers {
            if is_hop_by_hop(name) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        headers.insert(
            CACHE_SOURCE_HEADER,
            HeaderValue::from_static(self.source.as_str()),
        );

        response
    }
}

/// Entry count of one named store
#[derive(Debug, Clone, Serialize)]
pub struct StoreSize {
    pub name: String,
    pub entries: usize,
}

/// Response body for the stats endpoint (GET /__sw/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub puts: u64,
    pub put_failures: u64,
    pub fallbacks: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub stores: Vec<StoreSize>,
}

impl StatsResponse {
    pub fn new(stats: StatsSnapshot, sizes: Vec<(String, usize)>) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            fetches: stats.fetches,
            puts: stats.puts,
            put_failures: stats.put_failures,
            fallbacks: stats.fallbacks,
            stores: sizes
                .into_iter()
                .map(|(name, entries)| StoreSize { name, entries })
                .collect(),
        }
    }
}

/// Response body for the status endpoint (GET /__sw/status)
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub registration: RegistrationStatus,
    pub stores: Vec<String>,
}

/// Response body for an accepted control message (POST /__sw/message)
#[derive(Debug, Clone, Serialize)]
pub struct MessageAccepted {
    pub accepted: String,
}

impl MessageAccepted {
    pub fn new(message: ControlMessage) -> Self {
        Self {
            accepted: message.to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /__sw/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
