//! Policy Module
//!
//! Caching strategies applied to classified requests.

mod engine;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStorage, StoredResponse};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::InterceptedRequest;
use crate::routing::RouteClassifier;

pub use engine::PolicyEngine;

// == Cache Context ==
/// Store, network and routing handles shared by every worker.
#[derive(Clone)]
pub struct CacheContext {
    pub storage: Arc<CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub classifier: Arc<RouteClassifier>,
}

impl CacheContext {
    pub fn new(
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        classifier: Arc<RouteClassifier>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            classifier,
        }
    }

    /// Network fetch, counted in the shared stats.
    pub async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse> {
        self.storage.stats().record_fetch();
        self.fetcher.fetch(request).await
    }

    /// Sends a request to the network without touching any store.
    pub async fn passthrough(&self, request: &InterceptedRequest) -> Result<Served> {
        debug!(method = %request.method, url = %request.url, "Passing request through");
        let response = self.fetch(request).await?;
        Ok(Served::new(response, ResponseSource::Passthrough))
    }
}

// == Response Source ==
/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Precache,
    Runtime,
    /// The configured fallback document
    Fallback,
    /// Synthesized when even the fallback document is missing
    Offline,
    /// Not intercepted
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Precache => "precache",
            ResponseSource::Runtime => "runtime",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Offline => "offline",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

// == Served ==
/// A response handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn new(response: StoredResponse, source: ResponseSource) -> Self {
        Self { response, source }
    }
}
