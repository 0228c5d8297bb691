//! Worker
//!
//! One versioned instance of the caching layer and its lifecycle state.

use std::fmt;

use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info};
use url::Url;

use crate::cache::{CacheKey, CachedEntry};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::InterceptedRequest;
use crate::policy::{CacheContext, PolicyEngine, Served};

// == Worker State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

// == Worker Settings ==
/// Everything that distinguishes one worker version from another.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Version tag, e.g. `v3`
    pub version: String,
    /// Precache store name, e.g. `app-v3`
    pub precache: String,
    /// Runtime store name
    pub runtime: String,
    /// Absolute URLs fetched at install
    pub manifest: Vec<Url>,
    /// Absolute URL of the offline fallback document
    pub fallback: Url,
}

impl WorkerSettings {
    /// Settings for `version` with everything else taken from `config`.
    pub fn from_config(config: &Config, version: &str) -> Result<Self> {
        let origin = config.origin_url()?;
        let resolve = |target: &str| {
            origin
                .join(target)
                .map_err(|e| CacheError::Config(format!("invalid URL '{}': {}", target, e)))
        };

        Ok(Self {
            version: version.to_string(),
            precache: config.precache_name_for(version),
            runtime: config.runtime_cache.clone(),
            manifest: config
                .precache_manifest
                .iter()
                .map(|asset| resolve(asset))
                .collect::<Result<_>>()?,
            fallback: resolve(&config.fallback_url)?,
        })
    }
}

// == Worker ==
/// Serves requests through its policy engine once Active.
///
/// The state lock is held for the whole of Activate, so a request that
/// reads the state afterwards never observes a store being deleted.
pub struct Worker {
    settings: WorkerSettings,
    context: CacheContext,
    engine: PolicyEngine,
    state: RwLock<WorkerState>,
}

impl Worker {
    pub fn new(settings: WorkerSettings, context: CacheContext) -> Self {
        let engine = PolicyEngine::new(
            context.clone(),
            settings.precache.clone(),
            settings.runtime.clone(),
            &settings.fallback,
        );
        Self {
            settings,
            context,
            engine,
            state: RwLock::new(WorkerState::Installing),
        }
    }

    pub fn version(&self) -> &str {
        &self.settings.version
    }

    pub fn precache_name(&self) -> &str {
        &self.settings.precache
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    // == Install ==
    /// Fetches the whole manifest in parallel and commits it in one write.
    ///
    /// Every asset must answer 200. On any failure nothing is committed and
    /// the worker becomes Redundant.
    pub async fn install(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if *state != WorkerState::Installing {
                return Err(transition(*state, WorkerState::Waiting));
            }
        }

        info!(
            version = %self.settings.version,
            assets = self.settings.manifest.len(),
            "Installing, precaching core assets"
        );

        let fetches = self.settings.manifest.iter().map(|url| self.precache_asset(url));
        let committed = match try_join_all(fetches).await {
            Ok(entries) => self
                .context
                .storage
                .put_all(&self.settings.precache, entries)
                .await
                .map_err(|e| CacheError::InstallFailed(e.to_string())),
            Err(err) => Err(err),
        };

        let mut state = self.state.write().await;
        match committed {
            Ok(()) => {
                *state = WorkerState::Waiting;
                info!(version = %self.settings.version, store = %self.settings.precache, "Installed");
                Ok(())
            }
            Err(err) => {
                *state = WorkerState::Redundant;
                error!(version = %self.settings.version, error = %err, "Install failed");
                Err(err)
            }
        }
    }

    async fn precache_asset(&self, url: &Url) -> Result<CachedEntry> {
        let request = InterceptedRequest::get(url.clone());
        let response = self
            .context
            .fetch(&request)
            .await
            .map_err(|e| CacheError::InstallFailed(e.to_string()))?;

        if !response.is_cacheable_status() {
            return Err(CacheError::InstallFailed(format!(
                "{} returned status {}",
                url, response.status
            )));
        }
        Ok(CachedEntry::new(CacheKey::get(url), response))
    }

    // == Activate ==
    /// Deletes every store other than this version's precache and the runtime store.
    ///
    /// Allowed from Installing, Waiting or Active; re-running it with no
    /// stale stores is a no-op. Returns the deleted store names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let mut state = self.state.write().await;
        if *state == WorkerState::Redundant {
            return Err(transition(*state, WorkerState::Active));
        }

        info!(version = %self.settings.version, "Activating");
        let storage = &self.context.storage;
        let mut deleted = Vec::new();
        for name in storage.list_store_names().await {
            if name == self.settings.precache || name == self.settings.runtime {
                continue;
            }
            if storage.delete(&name).await {
                info!(store = %name, "Deleting old cache");
                deleted.push(name);
            }
        }

        *state = WorkerState::Active;
        Ok(deleted)
    }

    /// Superseded by a newer version. Touches no store.
    pub async fn mark_redundant(&self) {
        let mut state = self.state.write().await;
        if *state != WorkerState::Redundant {
            let from = *state;
            info!(version = %self.settings.version, from = %from, "Worker is now redundant");
            *state = WorkerState::Redundant;
        }
    }

    // == Handle ==
    /// Intercepts when Active; in every other state the request goes
    /// straight to the network.
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<Served> {
        let state = self.state().await;
        if state == WorkerState::Active {
            self.engine.handle(request).await
        } else {
            self.context.passthrough(request).await
        }
    }
}

fn transition(from: WorkerState, to: WorkerState) -> CacheError {
    CacheError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}
