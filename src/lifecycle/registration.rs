//! Registration
//!
//! Holds the Active and Waiting workers and drives transitions between them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;
use crate::lifecycle::{Worker, WorkerSettings, WorkerState};
use crate::models::InterceptedRequest;
use crate::policy::{CacheContext, Served};

#[derive(Default)]
struct Slots {
    active: Option<Arc<Worker>>,
    waiting: Option<Arc<Worker>>,
}

/// Versions currently held by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub active_version: Option<String>,
    pub active_state: Option<WorkerState>,
    pub waiting_version: Option<String>,
}

// == Registration ==
/// Owner of the worker slots for one origin.
///
/// Promotion holds the slot lock while Activate runs, so requests wait for
/// the stale-store cleanup to finish before they reach the new worker.
pub struct Registration {
    context: CacheContext,
    skip_waiting_on_install: bool,
    slots: Mutex<Slots>,
}

impl Registration {
    pub fn new(context: CacheContext, skip_waiting_on_install: bool) -> Self {
        Self {
            context,
            skip_waiting_on_install,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    // == Register ==
    /// Installs a new version.
    ///
    /// On install failure the current Active worker keeps serving and the
    /// error is returned. On success the new worker is promoted at once when
    /// nothing is Active or skip-waiting is configured; otherwise it waits.
    pub async fn register(&self, settings: WorkerSettings) -> Result<Arc<Worker>> {
        let worker = Arc::new(Worker::new(settings, self.context.clone()));

        if let Err(err) = worker.install().await {
            let slots = self.slots.lock().await;
            if let Some(active) = &slots.active {
                warn!(
                    version = %active.version(),
                    "Keeping previous version active after failed install"
                );
            }
            return Err(err);
        }

        let mut slots = self.slots.lock().await;
        if let Some(previous) = slots.waiting.take() {
            previous.mark_redundant().await;
        }

        if slots.active.is_none() || self.skip_waiting_on_install {
            Self::promote(&mut slots, Arc::clone(&worker)).await?;
        } else {
            info!(version = %worker.version(), "Installed version is waiting");
            slots.waiting = Some(Arc::clone(&worker));
        }
        Ok(worker)
    }

    // == Resume ==
    /// Reinstates a version that was Active before a restart, without
    /// fetching its manifest again.
    pub async fn resume(&self, settings: WorkerSettings) -> Result<Arc<Worker>> {
        let worker = Arc::new(Worker::new(settings, self.context.clone()));
        let mut slots = self.slots.lock().await;
        Self::promote(&mut slots, Arc::clone(&worker)).await?;
        info!(version = %worker.version(), "Resumed previously active version");
        Ok(worker)
    }

    // == Skip Waiting ==
    /// Promotes the Waiting worker now. Returns its version, or `None` if
    /// nothing was waiting.
    pub async fn skip_waiting(&self) -> Result<Option<String>> {
        let mut slots = self.slots.lock().await;
        match slots.waiting.take() {
            Some(worker) => {
                let version = worker.version().to_string();
                Self::promote(&mut slots, worker).await?;
                Ok(Some(version))
            }
            None => Ok(None),
        }
    }

    /// Called by the host once every consumer of the old version has gone.
    pub async fn release_clients(&self) -> Result<Option<String>> {
        self.skip_waiting().await
    }

    async fn promote(slots: &mut Slots, worker: Arc<Worker>) -> Result<()> {
        worker.activate().await?;
        info!(version = %worker.version(), store = %worker.precache_name(), "Now active");
        if let Some(old) = slots.active.replace(worker) {
            old.mark_redundant().await;
        }
        Ok(())
    }

    // == Clear ==
    /// Deletes every named store regardless of version.
    pub async fn clear_all_caches(&self) -> usize {
        let removed = self.context.storage.clear_all().await;
        info!(stores = removed, "Cleared all caches");
        removed
    }

    // == Handle ==
    /// Routes a request through the Active worker, or straight to the
    /// network when there is none.
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<Served> {
        let active = self.slots.lock().await.active.clone();
        match active {
            Some(worker) => worker.handle(request).await,
            None => self.context.passthrough(request).await,
        }
    }

    // == Introspection ==
    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.slots.lock().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Worker>> {
        self.slots.lock().await.waiting.clone()
    }

    pub async fn active_version(&self) -> Option<String> {
        self.active().await.map(|w| w.version().to_string())
    }

    pub async fn status(&self) -> RegistrationStatus {
        let (active, waiting) = {
            let slots = self.slots.lock().await;
            (slots.active.clone(), slots.waiting.clone())
        };
        let active_state = match &active {
            Some(worker) => Some(worker.state().await),
            None => None,
        };
        RegistrationStatus {
            active_version: active.map(|w| w.version().to_string()),
            active_state,
            waiting_version: waiting.map(|w| w.version().to_string()),
        }
    }
}
