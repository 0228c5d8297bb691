//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /__sw/health` - Health check endpoint
//! - `GET /__sw/stats` - Cache statistics
//! - `GET /__sw/status` - Active and waiting versions, store names
//! - `POST /__sw/message` - Queue a control command
//! - `POST /__sw/release` - Old clients are gone; promote the Waiting version
//! - any other `/__sw/` path - 404, never forwarded
//! - anything else - Intercepted and served through the caching layer
//!
//! With `SKIP_WAITING_ON_INSTALL=false` a freshly installed version waits
//! until either a `SKIP_WAITING` message or a release promotes it.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, CONTROL_PREFIX};
