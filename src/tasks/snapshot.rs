//! Snapshot Task
//!
//! Background task that periodically writes the store registry to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Snapshot;
use crate::error::Result;
use crate::lifecycle::Registration;

/// Captures the registration's stores and active version and writes them to `path`.
///
/// Returns the number of entries written.
pub async fn save_snapshot(registration: &Registration, path: &Path) -> Result<usize> {
    let active_version = registration.active_version().await;
    let snapshot = Snapshot::capture(&registration.context().storage, active_version).await;
    snapshot.save(path).await?;
    Ok(snapshot.entry_count())
}

/// Spawns a background task that saves a snapshot every `interval_secs`.
///
/// A failed save is logged and retried on the next tick.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_snapshot_task(
    registration: Arc<Registration>,
    path: PathBuf,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting snapshot task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match save_snapshot(&registration, &path).await {
                Ok(entries) => debug!("Snapshot: wrote {} entries", entries),
                Err(err) => warn!(path = %path.display(), error = %err, "Snapshot failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    use crate::cache::{CacheKey, CacheStorage, CachedEntry, StoredResponse};
    use crate::config::Config;
    use crate::fetch::testing::ScriptedFetcher;
    use crate::policy::CacheContext;
    use crate::routing::RouteClassifier;

    fn registration() -> Arc<Registration> {
        let config = Config {
            origin: "https://app.example".to_string(),
            ..Config::default()
        };
        let storage = Arc::new(CacheStorage::new(100));
        let classifier = Arc::new(RouteClassifier::from_config(&config).unwrap());
        let context = CacheContext::new(storage, Arc::new(ScriptedFetcher::new()), classifier);
        Arc::new(Registration::new(context, false))
    }

    async fn seed(registration: &Registration) {
        registration
            .context()
            .storage
            .put(
                "app-runtime",
                CachedEntry::new(
                    CacheKey::get(&Url::parse("https://app.example/lookup").unwrap()),
                    StoredResponse::new(200).with_body("cached"),
                ),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_save_snapshot_writes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let registration = registration();
        seed(&registration).await;

        let written = save_snapshot(&registration, &path).await.unwrap();
        assert_eq!(written, 1);

        let loaded = Snapshot::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.entry_count(), 1);
        assert!(loaded.active_version.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_task_writes_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let registration = registration();
        seed(&registration).await;

        let handle = spawn_snapshot_task(registration, path.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(path.exists(), "Snapshot should have been written");
        handle.abort();
    }

    #[tokio::test]
    async fn test_snapshot_task_can_be_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let handle = spawn_snapshot_task(registration(), dir.path().join("cache.json"), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
