//! Cache Key Module
//!
//! Request identity used to address stored responses.

use std::fmt;

use axum::http::Method;
use url::Url;

// == Cache Key ==
/// Identity of a stored response: method plus absolute URL.
///
/// Only GET requests produce a key, so nothing else can reach a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    method: String,
    url: String,
}

impl CacheKey {
    /// Key for a GET of `url`. The fragment never reaches the server and is dropped.
    pub fn get(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: Method::GET.to_string(),
            url: url.to_string(),
        }
    }

    /// Key for an arbitrary request, `None` unless the method is GET.
    pub fn for_request(method: &Method, url: &Url) -> Option<Self> {
        (*method == Method::GET).then(|| Self::get(url))
    }

    /// Rebuilds a key read back from a snapshot.
    pub(crate) fn from_parts(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
