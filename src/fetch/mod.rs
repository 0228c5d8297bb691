//! Fetch Module
//!
//! The only path from the caching layer to the network.

mod http;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::cache::StoredResponse;
use crate::error::Result;
use crate::models::InterceptedRequest;

pub use http::HttpFetcher;

/// Network access used by the policy engine and the install step.
///
/// Any response that arrives, whatever its status, is `Ok`. `Err` means no
/// response was received at all (DNS, connection, TLS or timeout failure)
/// and is always `CacheError::Fetch`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse>;
}

/// Headers that describe a single connection and are never forwarded.
pub fn is_hop_by_hop(name: &str) -> bool {
    const HOP_BY_HOP: &[&str] = &[
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "proxy-connection",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
        "host",
        "content-length",
    ];
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}
