//! Snapshot Module
//!
//! Saves the store registry to disk and restores it on startup.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStorage, CachedEntry, StoredResponse};
use crate::error::Result;

// == Snapshot ==
/// On-disk form of every named store plus the version that was serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    /// Version of the worker that was active when the snapshot was taken
    pub active_version: Option<String>,
    pub stores: Vec<StoreSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub name: String,
    pub entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl Snapshot {
    // == Capture ==
    /// Copies the current contents of `storage`.
    pub async fn capture(storage: &CacheStorage, active_version: Option<String>) -> Self {
        let stores = storage
            .export()
            .await
            .into_iter()
            .map(|(name, entries)| StoreSnapshot {
                name,
                entries: entries
                    .iter()
                    .map(|entry| EntrySnapshot {
                        method: entry.key.method().to_string(),
                        url: entry.key.url().to_string(),
                        status: entry.response.status,
                        headers: entry.response.headers.clone(),
                        body: entry.response.body.to_vec(),
                        stored_at: entry.stored_at,
                    })
                    .collect(),
            })
            .collect();

        Self {
            saved_at: Utc::now(),
            active_version,
            stores,
        }
    }

    // == Restore ==
    /// Replaces the contents of `storage`. Returns the recorded active version.
    pub async fn restore(self, storage: &CacheStorage) -> Option<String> {
        let contents = self
            .stores
            .into_iter()
            .map(|store| {
                let entries = store
                    .entries
                    .into_iter()
                    .map(|e| CachedEntry {
                        key: CacheKey::from_parts(e.method, e.url),
                        response: StoredResponse {
                            status: e.status,
                            headers: e.headers,
                            body: Bytes::from(e.body),
                        },
                        stored_at: e.stored_at,
                    })
                    .collect();
                (store.name, entries)
            })
            .collect();

        storage.import(contents).await;
        self.active_version
    }

    pub fn entry_count(&self) -> usize {
        self.stores.iter().map(|s| s.entries.len()).sum()
    }

    // == Save ==
    /// Writes the snapshot next to `path` and renames it into place.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let encoded = serde_json::to_vec(self)?;
        let tmp = path.with_extension("tmp");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), entries = self.entry_count(), "Snapshot saved");
        Ok(())
    }

    // == Load ==
    /// Reads a snapshot. A missing file is a cold start and yields `None`.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting cold");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot: Self = serde_json::from_slice(&raw)?;
        info!(
            path = %path.display(),
            stores = snapshot.stores.len(),
            entries = snapshot.entry_count(),
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }
}
