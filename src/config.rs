//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::{CacheError, Result};

// == Defaults ==
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080";
const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/static/main.css",
    "/static/dynasty.css",
    "/static/theme.css",
    "/static/loading.css",
    "/static/cookie-consent.css",
    "/static/tiers.js",
    "/static/loading.js",
    "/static/manifest.json",
    "/static/favicon.svg",
];
const DEFAULT_EXCLUDED_HOSTS: &[&str] = &["sleeper.app", "keeptradecut.com", "borischen.co"];
const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/admin", "/metrics"];
const DEFAULT_STATIC_PREFIXES: &[&str] = &["/static/"];

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin server every relative request is resolved against
    pub origin: String,
    /// HTTP server port
    pub server_port: u16,
    /// Prefix shared by every store name
    pub cache_prefix: String,
    /// Version tag of the running build's precache store
    pub cache_version: String,
    /// Name of the unversioned runtime store
    pub runtime_cache: String,
    /// Assets fetched into the precache store at install
    pub precache_manifest: Vec<String>,
    /// Host substrings that always bypass caching
    pub excluded_hosts: Vec<String>,
    /// Same-origin path prefixes that always bypass caching
    pub excluded_paths: Vec<String>,
    /// Path prefixes served cache-first
    pub static_prefixes: Vec<String>,
    /// Document returned when network and runtime store both miss
    pub fallback_url: String,
    /// Maximum number of entries per named store
    pub max_entries: usize,
    /// Snapshot file for persisting stores across restarts
    pub snapshot_path: Option<PathBuf>,
    /// Background snapshot interval in seconds
    pub snapshot_interval: u64,
    /// Promote a freshly installed version without waiting for old clients
    pub skip_waiting_on_install: bool,
    /// Network request timeout in seconds, 0 = none
    pub fetch_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// List-valued variables are comma separated. The result is validated
    /// before it is returned.
    ///
    /// # Environment Variables
    /// - `ORIGIN_URL` - Origin server (default: http://127.0.0.1:8080)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_PREFIX` - Store name prefix (default: app)
    /// - `CACHE_VERSION` - Precache version tag (default: v1)
    /// - `RUNTIME_CACHE` - Runtime store name (default: {prefix}-runtime)
    /// - `PRECACHE_MANIFEST` - Assets to precache
    /// - `EXCLUDED_HOSTS` - Third-party hosts never cached
    /// - `EXCLUDED_PATHS` - Same-origin paths never cached (default: /admin,/metrics)
    /// - `STATIC_PREFIXES` - Cache-first path prefixes (default: /static/)
    /// - `FALLBACK_URL` - Offline fallback document (default: /)
    /// - `MAX_ENTRIES` - Maximum entries per store (default: 1000)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: unset)
    /// - `SNAPSHOT_INTERVAL` - Snapshot frequency in seconds (default: 30)
    /// - `SKIP_WAITING_ON_INSTALL` - Promote new versions immediately (default: true)
    /// - `FETCH_TIMEOUT` - Network timeout in seconds, 0 = none (default: 0)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let cache_prefix = env_string("CACHE_PREFIX", &defaults.cache_prefix);
        let runtime_default = format!("{}-runtime", cache_prefix);

        let config = Self {
            origin: env_string("ORIGIN_URL", &defaults.origin),
            server_port: env_parse("SERVER_PORT", defaults.server_port),
            cache_version: env_string("CACHE_VERSION", &defaults.cache_version),
            runtime_cache: env_string("RUNTIME_CACHE", &runtime_default),
            cache_prefix,
            precache_manifest: env_list("PRECACHE_MANIFEST", defaults.precache_manifest),
            excluded_hosts: env_list("EXCLUDED_HOSTS", defaults.excluded_hosts),
            excluded_paths: env_list("EXCLUDED_PATHS", defaults.excluded_paths),
            static_prefixes: env_list("STATIC_PREFIXES", defaults.static_prefixes),
            fallback_url: env_string("FALLBACK_URL", &defaults.fallback_url),
            max_entries: env_parse("MAX_ENTRIES", defaults.max_entries),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            snapshot_interval: env_parse("SNAPSHOT_INTERVAL", defaults.snapshot_interval),
            skip_waiting_on_install: env_parse(
                "SKIP_WAITING_ON_INSTALL",
                defaults.skip_waiting_on_install,
            ),
            fetch_timeout: env_parse("FETCH_TIMEOUT", defaults.fetch_timeout),
        };

        config.validate()?;
        Ok(config)
    }

    // == Validate ==
    /// Checks the values that would otherwise fail at first use.
    pub fn validate(&self) -> Result<()> {
        let origin = self.origin_url()?;

        if self.cache_version.trim().is_empty() {
            return Err(CacheError::Config("CACHE_VERSION cannot be empty".to_string()));
        }
        if self.runtime_cache == self.precache_name() {
            return Err(CacheError::Config(format!(
                "runtime store name '{}' collides with the precache store",
                self.runtime_cache
            )));
        }
        if self.max_entries == 0 {
            return Err(CacheError::Config("MAX_ENTRIES must be at least 1".to_string()));
        }

        let fallback = origin
            .join(&self.fallback_url)
            .map_err(|e| CacheError::Config(format!("invalid FALLBACK_URL: {}", e)))?;
        if fallback.origin() != origin.origin() {
            return Err(CacheError::Config(format!(
                "FALLBACK_URL '{}' is not same-origin",
                self.fallback_url
            )));
        }

        for asset in &self.precache_manifest {
            origin.join(asset).map_err(|e| {
                CacheError::Config(format!("invalid manifest entry '{}': {}", asset, e))
            })?;
        }

        Ok(())
    }

    /// Parsed origin URL.
    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| CacheError::Config(format!("invalid ORIGIN_URL '{}': {}", self.origin, e)))
    }

    /// Name of the precache store for a version tag, e.g. `app-v3`.
    pub fn precache_name_for(&self, version: &str) -> String {
        format!("{}-{}", self.cache_prefix, version)
    }

    /// Name of the running build's precache store.
    pub fn precache_name(&self) -> String {
        self.precache_name_for(&self.cache_version)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            server_port: 3000,
            cache_prefix: "app".to_string(),
            cache_version: "v1".to_string(),
            runtime_cache: "app-runtime".to_string(),
            precache_manifest: to_strings(DEFAULT_MANIFEST),
            excluded_hosts: to_strings(DEFAULT_EXCLUDED_HOSTS),
            excluded_paths: to_strings(DEFAULT_EXCLUDED_PATHS),
            static_prefixes: to_strings(DEFAULT_STATIC_PREFIXES),
            fallback_url: "/".to_string(),
            max_entries: 1000,
            snapshot_path: None,
            snapshot_interval: 30,
            skip_waiting_on_install: true,
            fetch_timeout: 0,
        }
    }
}

// == Env Helpers ==
fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str, default: Vec<String>) -> Vec<String> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default,
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
