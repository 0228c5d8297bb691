//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No route under the control prefix
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store refused a write (entry limit or body size)
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// No response was received from the network
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Network response body over the size limit
    #[error("Response too large: {0}")]
    ResponseTooLarge(String),

    /// Precache population did not complete for every manifest asset
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// Lifecycle transition not allowed from the current state
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Control task is no longer running
    #[error("Control channel closed")]
    ChannelClosed,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::QuotaExceeded(_) => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Fetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::ResponseTooLarge(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CacheError::InstallFailed(_)
            | CacheError::ChannelClosed
            | CacheError::Config(_)
            | CacheError::Io(_)
            | CacheError::Serialization(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, CacheError>;
