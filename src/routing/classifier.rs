//! Route Classifier
//!
//! Pure mapping from a request to the caching policy that applies to it.

use axum::http::Method;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::Result;

// == Route Class ==
/// Caching class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Straight to network, no store read or write
    Excluded,
    /// Cache-first
    StaticAsset,
    /// Network-first
    Dynamic,
}

// == Route Rules ==
/// Declarative rule set the classifier evaluates.
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    /// Host substrings of third-party origins
    pub excluded_hosts: Vec<String>,
    /// Same-origin path prefixes that are never cached
    pub excluded_paths: Vec<String>,
    /// Path prefixes of static assets
    pub static_prefixes: Vec<String>,
}

// == Route Classifier ==
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    origin: Url,
    rules: RouteRules,
}

impl RouteClassifier {
    pub fn new(origin: Url, rules: RouteRules) -> Self {
        let rules = RouteRules {
            excluded_hosts: rules
                .excluded_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            ..rules
        };
        Self { origin, rules }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.origin_url()?,
            RouteRules {
                excluded_hosts: config.excluded_hosts.clone(),
                excluded_paths: config.excluded_paths.clone(),
                static_prefixes: config.static_prefixes.clone(),
            },
        ))
    }

    // == Classify ==
    /// Maps a request to its caching class.
    ///
    /// Order: non-GET, deny-listed host, excluded same-origin path, then the
    /// root document or a static prefix. Everything else is dynamic.
    pub fn classify(&self, method: &Method, url: &Url) -> RouteClass {
        if *method != Method::GET {
            return RouteClass::Excluded;
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self
            .rules
            .excluded_hosts
            .iter()
            .any(|denied| host.contains(denied.as_str()))
        {
            return RouteClass::Excluded;
        }

        let path = url.path();
        if self.is_same_origin(url)
            && self
                .rules
                .excluded_paths
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return RouteClass::Excluded;
        }

        if path == "/"
            || self
                .rules
                .static_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return RouteClass::StaticAsset;
        }

        RouteClass::Dynamic
    }

    /// Only same-origin responses are ever written to a store.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}
