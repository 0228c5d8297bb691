//! API Handlers
//!
//! Control endpoints and the catch-all interception handler.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use url::Url;

use crate::control::{ControlChannel, ControlMessage};
use crate::error::{CacheError, Result};
use crate::lifecycle::Registration;
use crate::models::{
    HealthResponse, InterceptedRequest, MessageAccepted, StatsResponse, StatusResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Worker registration every request is routed through
    pub registration: Arc<Registration>,
    /// Queue feeding the control task
    pub control: ControlChannel,
    /// Origin relative request targets are resolved against
    pub origin: Url,
}

impl AppState {
    /// Creates a new AppState, taking the origin from the registration's classifier.
    pub fn new(registration: Arc<Registration>, control: ControlChannel) -> Self {
        let origin = registration.context().classifier.origin().clone();
        Self {
            registration,
            control,
            origin,
        }
    }
}

/// Catch-all handler: every request outside the control prefix.
pub async fn intercept_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let intercepted = InterceptedRequest::from_http(request, &state.origin).await?;
    let served = state.registration.handle(&intercepted).await?;
    debug!(
        method = %intercepted.method,
        url = %intercepted.url,
        status = served.response.status,
        source = served.source.as_str(),
        "Served"
    );
    Ok(served.into_response())
}

/// Handler for POST /__sw/message
///
/// Queues a control command and returns without waiting for it.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<ControlMessage>,
) -> Result<(StatusCode, Json<MessageAccepted>)> {
    state.control.post(message).await?;
    Ok((StatusCode::ACCEPTED, Json(MessageAccepted::new(message))))
}

/// Handler for POST /__sw/release
///
/// Signals that every consumer of the old version has gone and promotes
/// the Waiting version, if any.
pub async fn release_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    if let Some(version) = state.registration.release_clients().await? {
        debug!(version = %version, "Clients released");
    }
    Ok(Json(StatusResponse {
        registration: state.registration.status().await,
        stores: state.registration.context().storage.list_store_names().await,
    }))
}

/// Fallback for unmatched paths under the control prefix.
pub async fn control_not_found(OriginalUri(uri): OriginalUri) -> CacheError {
    CacheError::NotFound(format!("no control endpoint at {}", uri.path()))
}

/// Handler for GET /__sw/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let storage = &state.registration.context().storage;
    Json(StatsResponse::new(
        storage.stats().snapshot(),
        storage.store_sizes().await,
    ))
}

/// Handler for GET /__sw/status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        registration: state.registration.status().await,
        stores: state.registration.context().storage.list_store_names().await,
    })
}

/// Handler for GET /__sw/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
