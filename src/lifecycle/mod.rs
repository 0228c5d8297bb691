//! Lifecycle Module
//!
//! Versioned workers and the registration that installs, activates and
//! retires them.

mod registration;
mod worker;

pub use registration::{Registration, RegistrationStatus};
pub use worker::{Worker, WorkerSettings, WorkerState};
