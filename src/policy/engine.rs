//! Policy Engine
//!
//! Cache-First for static assets, Network-First for dynamic requests,
//! passthrough for excluded ones.

use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheKey, CachedEntry, StoredResponse};
use crate::error::Result;
use crate::models::InterceptedRequest;
use crate::policy::{CacheContext, ResponseSource, Served};
use crate::routing::RouteClass;

const OFFLINE_BODY: &str = "Offline - please check your connection";

// == Policy Engine ==
/// Strategy selection and store access for one worker version.
pub struct PolicyEngine {
    context: CacheContext,
    /// Current precache store name
    precache: String,
    /// Runtime store name
    runtime: String,
    /// Key of the offline fallback document
    fallback: CacheKey,
}

impl PolicyEngine {
    pub fn new(
        context: CacheContext,
        precache: impl Into<String>,
        runtime: impl Into<String>,
        fallback_url: &Url,
    ) -> Self {
        Self {
            context,
            precache: precache.into(),
            runtime: runtime.into(),
            fallback: CacheKey::get(fallback_url),
        }
    }

    // == Handle ==
    /// Produces the response for one intercepted request.
    ///
    /// Dynamic requests always yield a response. Static assets fail only when
    /// they are absent from every store and the network is unreachable.
    /// Excluded requests fail whenever the network does.
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<Served> {
        let class = self
            .context
            .classifier
            .classify(&request.method, &request.url);

        let key = match (class, request.key()) {
            (RouteClass::Excluded, _) | (_, None) => {
                return self.context.passthrough(request).await;
            }
            (_, Some(key)) => key,
        };

        match class {
            RouteClass::StaticAsset => self.cache_first(request, key).await,
            _ => Ok(self.network_first(request, key).await),
        }
    }

    // == Cache First ==
    async fn cache_first(&self, request: &InterceptedRequest, key: CacheKey) -> Result<Served> {
        let stores = [self.precache.as_str(), self.runtime.as_str()];
        if let Some((store, entry)) = self.context.storage.lookup_any(&stores, &key).await {
            debug!(key = %key, store = %store, "Serving from cache");
            let source = if store == self.precache {
                ResponseSource::Precache
            } else {
                ResponseSource::Runtime
            };
            return Ok(Served::new(entry.response.clone(), source));
        }

        debug!(key = %key, "Cache miss, fetching");
        let response = self.context.fetch(request).await?;
        self.populate(request, key, &response).await;
        Ok(Served::new(response, ResponseSource::Network))
    }

    // == Network First ==
    async fn network_first(&self, request: &InterceptedRequest, key: CacheKey) -> Served {
        match self.context.fetch(request).await {
            Ok(response) => {
                self.populate(request, key, &response).await;
                Served::new(response, ResponseSource::Network)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Network failed, falling back to cache");
                if let Some(entry) = self.context.storage.lookup(&self.runtime, &key).await {
                    debug!(key = %key, "Serving runtime copy");
                    return Served::new(entry.response.clone(), ResponseSource::Runtime);
                }
                self.fallback().await
            }
        }
    }

    // == Populate ==
    /// Best-effort write-through into the runtime store.
    async fn populate(&self, request: &InterceptedRequest, key: CacheKey, response: &StoredResponse) {
        if !response.is_cacheable_status() {
            debug!(key = %key, status = response.status, "Not caching non-200 response");
            return;
        }
        if !self.context.classifier.is_same_origin(&request.url) {
            debug!(key = %key, "Not caching cross-origin response");
            return;
        }

        let entry = CachedEntry::new(key, response.clone());
        if let Err(err) = self.context.storage.put(&self.runtime, entry).await {
            warn!(store = %self.runtime, error = %err, "Cache write failed, serving response anyway");
        }
    }

    // == Fallback ==
    async fn fallback(&self) -> Served {
        self.context.storage.stats().record_fallback();

        let stores = [self.precache.as_str(), self.runtime.as_str()];
        if let Some((_, entry)) = self
            .context
            .storage
            .lookup_any(&stores, &self.fallback)
            .await
        {
            return Served::new(entry.response.clone(), ResponseSource::Fallback);
        }

        warn!(fallback = %self.fallback, "Fallback document not cached");
        Served::new(
            StoredResponse::new(503)
                .with_header("content-type", "text/plain")
                .with_body(OFFLINE_BODY),
            ResponseSource::Offline,
        )
    }
}
