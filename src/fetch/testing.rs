//! Scripted in-memory fetcher for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::cache::StoredResponse;
use crate::error::{CacheError, Result};
use crate::fetch::Fetcher;
use crate::models::InterceptedRequest;

/// Answers from a fixed URL map; unknown URLs get a 404.
///
/// A held URL parks its fetch until the returned `Notify` is signalled.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, StoredResponse>>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: StoredResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn respond_ok(&self, url: &str, body: &'static str) {
        self.respond(url, StoredResponse::new(200).with_body(body));
    }

    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held
            .lock()
            .unwrap()
            .insert(url.to_string(), gate.clone());
        gate
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.url.to_string());

        let gate = self.held.lock().unwrap().get(request.url.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Fetch(format!("{}: network unreachable", request.url)));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| StoredResponse::new(404).with_body("not found")))
    }
}
