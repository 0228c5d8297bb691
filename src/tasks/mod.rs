//! Background Tasks Module
//!
//! Contains background tasks that run periodically during proxy operation.
//!
//! # Tasks
//! - Snapshot: Persists every store to disk at configured intervals

mod snapshot;

pub use snapshot::{save_snapshot, spawn_snapshot_task};
