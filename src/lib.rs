//! Offline Cache - An offline-first caching proxy
//!
//! Serves previously fetched responses when the origin is unreachable,
//! keeps a versioned precache of static assets and applies cache-first or
//! network-first policies per request class.

pub mod api;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod routing;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use control::{spawn_control_task, ControlChannel, ControlMessage};
pub use lifecycle::{Registration, WorkerSettings};
pub use tasks::spawn_snapshot_task;
