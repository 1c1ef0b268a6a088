//! Cached HTTP response representation

use crate::freshness::Freshness;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An immutable HTTP response representation as stored by cache levels
///
/// Each cache tier owns its own copy; there is no shared mutable state
/// across tiers. Cloning is cheap: the body is a reference-counted
/// [`Bytes`] buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    status: u16,
    /// Header name/value pairs in response order, duplicates preserved
    headers: Vec<(String, String)>,
    body: Bytes,
    freshness: Freshness,
}

impl CachedResponse {
    /// Create a cached response snapshot
    pub fn new(
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
        freshness: Freshness,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            freshness,
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// All headers in response order, duplicates preserved
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of the named header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Response body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Freshness metadata captured when the response was received
    pub fn freshness(&self) -> &Freshness {
        &self.freshness
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is a server error (>= 500)
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Approximate size of the entry in bytes (body plus headers)
    pub fn size_bytes(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(key, value)| key.len() + value.len())
                .sum::<usize>()
    }
}
