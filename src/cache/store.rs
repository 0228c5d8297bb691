//! Cache Store Module
//!
//! Registry of named stores mapping request keys to immutable response entries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheKey, CacheStats, CachedEntry, MAX_BODY_SIZE};
use crate::error::{CacheError, Result};

// == Named Store ==
#[derive(Debug, Default)]
struct NamedStore {
    entries: HashMap<CacheKey, Arc<CachedEntry>>,
}

// == Cache Storage ==
/// All named stores behind a single lock.
///
/// `put`, `put_all`, `delete` and `clear_all` hold the write lock for their
/// whole duration, so a reader sees either the previous entry or the new one
/// and a clear in progress holds back concurrent writes. Lookups share the
/// read lock and run concurrently.
#[derive(Debug)]
pub struct CacheStorage {
    /// Stores by name
    stores: RwLock<BTreeMap<String, NamedStore>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed per store
    max_entries: usize,
}

impl CacheStorage {
    // == Constructor ==
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries each named store can hold
    pub fn new(max_entries: usize) -> Self {
        Self {
            stores: RwLock::new(BTreeMap::new()),
            stats: CacheStats::new(),
            max_entries,
        }
    }

    // == Open ==
    /// Creates the named store if absent. Returns true when it was created.
    pub async fn open(&self, name: &str) -> bool {
        let mut stores = self.stores.write().await;
        if stores.contains_key(name) {
            return false;
        }
        stores.insert(name.to_string(), NamedStore::default());
        debug!(store = name, "Opened new store");
        true
    }

    // == Put ==
    /// Stores an entry, replacing any entry with the same key.
    ///
    /// The store is created if absent. Fails with `QuotaExceeded` when the
    /// body is too large or a new key would exceed the entry limit.
    pub async fn put(&self, name: &str, entry: CachedEntry) -> Result<()> {
        if let Err(err) = check_body_size(&entry) {
            self.stats.record_put_failure();
            return Err(err);
        }

        let mut stores = self.stores.write().await;
        let store = stores.entry(name.to_string()).or_default();

        if !store.entries.contains_key(&entry.key) && store.entries.len() >= self.max_entries {
            self.stats.record_put_failure();
            return Err(CacheError::QuotaExceeded(format!(
                "store '{}' is full ({} entries)",
                name, self.max_entries
            )));
        }

        store.entries.insert(entry.key.clone(), Arc::new(entry));
        self.stats.record_put();
        Ok(())
    }

    // == Put All ==
    /// Stores every entry or none of them.
    pub async fn put_all(&self, name: &str, entries: Vec<CachedEntry>) -> Result<()> {
        for entry in &entries {
            check_body_size(entry)?;
        }

        let mut stores = self.stores.write().await;
        let existing = stores.get(name);
        let new_keys = entries
            .iter()
            .filter(|e| existing.map_or(true, |s| !s.entries.contains_key(&e.key)))
            .map(|e| &e.key)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let current = existing.map_or(0, |s| s.entries.len());

        if current + new_keys > self.max_entries {
            return Err(CacheError::QuotaExceeded(format!(
                "store '{}' cannot hold {} more entries",
                name, new_keys
            )));
        }

        let store = stores.entry(name.to_string()).or_default();
        for entry in entries {
            store.entries.insert(entry.key.clone(), Arc::new(entry));
            self.stats.record_put();
        }
        Ok(())
    }

    // == Lookup ==
    /// Exact key lookup in one store.
    pub async fn lookup(&self, name: &str, key: &CacheKey) -> Option<Arc<CachedEntry>> {
        let stores = self.stores.read().await;
        let found = stores.get(name).and_then(|s| s.entries.get(key)).cloned();
        self.record_lookup(found.is_some());
        found
    }

    /// First hit across `names`, searched in order. Returns the store name with the entry.
    pub async fn lookup_any(
        &self,
        names: &[&str],
        key: &CacheKey,
    ) -> Option<(String, Arc<CachedEntry>)> {
        let stores = self.stores.read().await;
        let found = names.iter().find_map(|name| {
            stores
                .get(*name)
                .and_then(|s| s.entries.get(key))
                .map(|entry| (name.to_string(), Arc::clone(entry)))
        });
        self.record_lookup(found.is_some());
        found
    }

    // == Delete ==
    /// Removes a whole named store. Returns false if it did not exist.
    pub async fn delete(&self, name: &str) -> bool {
        self.stores.write().await.remove(name).is_some()
    }

    // == Clear All ==
    /// Removes every store. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let mut stores = self.stores.write().await;
        let count = stores.len();
        stores.clear();
        count
    }

    // == Enumeration ==
    /// Names of all stores, sorted.
    pub async fn list_store_names(&self) -> Vec<String> {
        self.stores.read().await.keys().cloned().collect()
    }

    pub async fn has_store(&self, name: &str) -> bool {
        self.stores.read().await.contains_key(name)
    }

    /// Number of entries in a store, 0 if it does not exist.
    pub async fn entry_count(&self, name: &str) -> usize {
        self.stores
            .read()
            .await
            .get(name)
            .map_or(0, |s| s.entries.len())
    }

    /// Entry count of every store.
    pub async fn store_sizes(&self) -> Vec<(String, usize)> {
        self.stores
            .read()
            .await
            .iter()
            .map(|(name, s)| (name.clone(), s.entries.len()))
            .collect()
    }

    // == Export / Import ==
    /// Every store with its entries, sorted by key.
    pub async fn export(&self) -> Vec<(String, Vec<Arc<CachedEntry>>)> {
        let stores = self.stores.read().await;
        stores
            .iter()
            .map(|(name, store)| {
                let mut entries: Vec<_> = store.entries.values().cloned().collect();
                entries.sort_by(|a, b| a.key.cmp(&b.key));
                (name.clone(), entries)
            })
            .collect()
    }

    /// Replaces the whole registry.
    pub async fn import(&self, contents: Vec<(String, Vec<CachedEntry>)>) {
        let mut stores = self.stores.write().await;
        stores.clear();
        for (name, entries) in contents {
            let store = stores.entry(name).or_default();
            for entry in entries {
                store.entries.insert(entry.key.clone(), Arc::new(entry));
            }
        }
    }

    // == Stats ==
    /// Shared counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
    }
}

fn check_body_size(entry: &CachedEntry) -> Result<()> {
    if entry.body_len() > MAX_BODY_SIZE {
        return Err(CacheError::QuotaExceeded(format!(
            "body of {} exceeds maximum size of {} bytes",
            entry.key, MAX_BODY_SIZE
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoredResponse;
    use url::Url;

    fn key(path: &str) -> CacheKey {
        CacheKey::get(&Url::parse("https://app.example").unwrap().join(path).unwrap())
    }

    fn entry(path: &str, body: &'static str) -> CachedEntry {
        CachedEntry::new(key(path), StoredResponse::new(200).with_body(body))
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = CacheStorage::new(10);
        assert!(storage.open("app-v1").await);
        assert!(!storage.open("app-v1").await);
        assert_eq!(storage.list_store_names().await, vec!["app-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let storage = CacheStorage::new(10);
        storage.put("app-runtime", entry("/a", "alpha")).await.unwrap();

        let found = storage.lookup("app-runtime", &key("/a")).await.unwrap();
        assert_eq!(&found.response.body[..], b"alpha");
        assert!(storage.lookup("app-runtime", &key("/b")).await.is_none());
        assert!(storage.lookup("app-v1", &key("/a")).await.is_none());

        let stats = storage.stats().snapshot();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.puts, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = CacheStorage::new(10);
        storage.put("s", entry("/a", "one")).await.unwrap();
        storage.put("s", entry("/a", "two")).await.unwrap();

        assert_eq!(storage.entry_count("s").await, 1);
        let found = storage.lookup("s", &key("/a")).await.unwrap();
        assert_eq!(&found.response.body[..], b"two");
    }

    #[tokio::test]
    async fn test_reader_keeps_previous_entry_after_overwrite() {
        let storage = CacheStorage::new(10);
        storage.put("s", entry("/a", "one")).await.unwrap();
        let held = storage.lookup("s", &key("/a")).await.unwrap();

        storage.put("s", entry("/a", "two")).await.unwrap();

        assert_eq!(&held.response.body[..], b"one");
    }

    #[tokio::test]
    async fn test_put_quota_exceeded() {
        let storage = CacheStorage::new(2);
        storage.put("s", entry("/a", "a")).await.unwrap();
        storage.put("s", entry("/b", "b")).await.unwrap();

        let result = storage.put("s", entry("/c", "c")).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));

        // Overwriting an existing key is still allowed at capacity
        storage.put("s", entry("/a", "a2")).await.unwrap();
        assert_eq!(storage.stats().snapshot().put_failures, 1);
    }

    #[tokio::test]
    async fn test_put_body_too_large() {
        let storage = CacheStorage::new(10);
        let big = CachedEntry::new(
            key("/big"),
            StoredResponse::new(200).with_body(vec![0u8; MAX_BODY_SIZE + 1]),
        );

        let result = storage.put("s", big).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));
        assert!(!storage.has_store("s").await);
    }

    #[tokio::test]
    async fn test_put_all_is_all_or_nothing() {
        let storage = CacheStorage::new(2);
        let result = storage
            .put_all("s", vec![entry("/a", "a"), entry("/b", "b"), entry("/c", "c")])
            .await;

        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));
        assert_eq!(storage.entry_count("s").await, 0);

        storage
            .put_all("s", vec![entry("/a", "a"), entry("/b", "b")])
            .await
            .unwrap();
        assert_eq!(storage.entry_count("s").await, 2);
    }

    #[tokio::test]
    async fn test_lookup_any_searches_in_order() {
        let storage = CacheStorage::new(10);
        storage.put("app-v1", entry("/x", "precache")).await.unwrap();
        storage.put("app-runtime", entry("/x", "runtime")).await.unwrap();
        storage.put("app-runtime", entry("/y", "runtime-y")).await.unwrap();

        let (store, found) = storage
            .lookup_any(&["app-v1", "app-runtime"], &key("/x"))
            .await
            .unwrap();
        assert_eq!(store, "app-v1");
        assert_eq!(&found.response.body[..], b"precache");

        let (store, _) = storage
            .lookup_any(&["app-v1", "app-runtime"], &key("/y"))
            .await
            .unwrap();
        assert_eq!(store, "app-runtime");

        assert!(storage
            .lookup_any(&["app-v1", "app-runtime"], &key("/z"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_store() {
        let storage = CacheStorage::new(10);
        storage.put("app-v2", entry("/a", "a")).await.unwrap();

        assert!(storage.delete("app-v2").await);
        assert!(!storage.delete("app-v2").await);
        assert!(storage.lookup("app-v2", &key("/a")).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let storage = CacheStorage::new(10);
        storage.put("app-v1", entry("/a", "a")).await.unwrap();
        storage.put("app-runtime", entry("/b", "b")).await.unwrap();

        assert_eq!(storage.clear_all().await, 2);
        assert!(storage.list_store_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_blocks_concurrent_puts() {
        let storage = Arc::new(CacheStorage::new(100));
        for i in 0..20 {
            storage
                .put("s", entry(&format!("/{}", i), "x"))
                .await
                .unwrap();
        }

        let writer = {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                for i in 20..40 {
                    storage
                        .put("s", entry(&format!("/{}", i), "y"))
                        .await
                        .unwrap();
                }
            })
        };
        storage.clear_all().await;
        writer.await.unwrap();

        // Every surviving entry was written after the clear completed
        for (_, entries) in storage.export().await {
            assert!(entries.iter().all(|e| &e.response.body[..] == b"y"));
        }
    }

    #[tokio::test]
    async fn test_export_import() {
        let storage = CacheStorage::new(10);
        storage.put("s", entry("/b", "b")).await.unwrap();
        storage.put("s", entry("/a", "a")).await.unwrap();

        let exported = storage.export().await;
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].1[0].key, key("/a"));

        let other = CacheStorage::new(10);
        other.open("stale").await;
        other
            .import(
                exported
                    .into_iter()
                    .map(|(n, es)| (n, es.iter().map(|e| (**e).clone()).collect()))
                    .collect(),
            )
            .await;
        assert_eq!(other.list_store_names().await, vec!["s".to_string()]);
        assert_eq!(other.entry_count("s").await, 2);
    }
}
