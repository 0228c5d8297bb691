//! Offline Cache - An offline-first caching proxy
//!
//! Serves previously fetched responses when the origin is unreachable,
//! keeps a versioned precache of static assets and applies cache-first or
//! network-first policies per request class.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::cache::{CacheStorage, Snapshot};
use offline_cache::fetch::{Fetcher, HttpFetcher};
use offline_cache::policy::CacheContext;
use offline_cache::routing::RouteClassifier;
use offline_cache::tasks::save_snapshot;
use offline_cache::{
    create_router, spawn_control_task, spawn_snapshot_task, AppState, Config, Registration,
    WorkerSettings,
};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Restore stores from the snapshot file, if configured
/// 4. Resume the previously active version, then install the current one
/// 5. Start the control task and the background snapshot task
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM and save a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Cache proxy");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: origin={}, precache={}, runtime={}, assets={}, port={}",
        config.origin,
        config.precache_name(),
        config.runtime_cache,
        config.precache_manifest.len(),
        config.server_port
    );

    // Restore persisted stores
    let storage = Arc::new(CacheStorage::new(config.max_entries));
    let mut resumed_version = None;
    if let Some(path) = &config.snapshot_path {
        if let Some(snapshot) = Snapshot::load(path)
            .await
            .with_context(|| format!("failed to load snapshot {}", path.display()))?
        {
            resumed_version = snapshot.restore(&storage).await;
        }
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config)?);
    let classifier = Arc::new(RouteClassifier::from_config(&config)?);
    let context = CacheContext::new(storage, fetcher, classifier);
    let registration = Arc::new(Registration::new(context, config.skip_waiting_on_install));

    // Lifecycle: resume what was serving, then install the running build
    if let Some(version) = &resumed_version {
        registration
            .resume(WorkerSettings::from_config(&config, version)?)
            .await?;
    }
    if resumed_version.as_deref() != Some(config.cache_version.as_str()) {
        let settings = WorkerSettings::from_config(&config, &config.cache_version)?;
        if let Err(err) = registration.register(settings).await {
            warn!(error = %err, "Install of {} failed", config.cache_version);
        }
    }

    let (control, control_handle) = spawn_control_task(registration.clone());
    let snapshot_handle = config.snapshot_path.clone().map(|path| {
        spawn_snapshot_task(registration.clone(), path, config.snapshot_interval)
    });

    let app = create_router(AppState::new(registration.clone(), control));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Proxy listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(snapshot_handle))
        .await
        .context("server error")?;

    control_handle.abort();
    if let Some(path) = &config.snapshot_path {
        match save_snapshot(&registration, path).await {
            Ok(entries) => info!("Final snapshot saved with {} entries", entries),
            Err(err) => error!(error = %err, "Final snapshot failed"),
        }
    }

    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the snapshot task and allows graceful shutdown.
async fn shutdown_signal(snapshot_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = snapshot_handle {
        handle.abort();
        warn!("Snapshot task aborted");
    }
}
