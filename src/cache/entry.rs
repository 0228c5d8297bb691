//! Cache Entry Module
//!
//! Defines stored responses and the immutable entries that hold them.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::cache::CacheKey;

// == Stored Response ==
/// An HTTP response as received from the network or read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl StoredResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header, keeping earlier values for the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Only an exact 200 is ever persisted.
    pub fn is_cacheable_status(&self) -> bool {
        self.status == 200
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// == Cache Entry ==
/// A response stored under its request key.
///
/// Entries are never mutated after construction; a store replaces the whole
/// entry on overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Request identity
    pub key: CacheKey,
    /// Stored response
    pub response: StoredResponse,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl CachedEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: CacheKey, response: StoredResponse) -> Self {
        Self {
            key,
            response,
            stored_at: Utc::now(),
        }
    }

    /// Size of the stored body in bytes.
    pub fn body_len(&self) -> usize {
        self.response.body.len()
    }
}
