//! Control Channel Module
//!
//! Commands the hosting application sends to the caching layer.
//!
//! # Commands
//! - `SKIP_WAITING` - Promote the waiting version immediately
//! - `CLEAR_CACHE` - Delete every named store

mod channel;

pub use channel::{spawn_control_task, Completion, ControlChannel, ControlMessage, ControlOutcome};
