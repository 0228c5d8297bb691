//! Request and Response models for the caching proxy
//!
//! This module defines the intercepted request type handed to the policy
//! engine and the DTOs served by the control endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::InterceptedRequest;
pub use responses::{
    HealthResponse, MessageAccepted, StatsResponse, StatusResponse, StoreSize, CACHE_SOURCE_HEADER,
};
