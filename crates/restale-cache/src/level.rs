//! The cache-level contract implemented by every tier

use crate::{error::CacheResult, response::CachedResponse};
use async_trait::async_trait;

/// A single cache tier
///
/// Implementations must support safe concurrent access from multiple tasks
/// without external locking; the cascade performs no locking of its own.
/// Keys are always request URLs, values are full response representations.
///
/// Any method may fail with an I/O-style error without corrupting the
/// chain; the cascade swallows and logs per-level failures.
#[async_trait]
pub trait CacheLevel: Send + Sync {
    /// Identifier for logging and registration
    fn name(&self) -> &str;

    /// Look up a cached response. Staleness is not evaluated here; levels
    /// keep expired entries around so the stale-while-revalidate and
    /// stale-if-error windows can still be served.
    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>>;

    /// Store a response under the key, replacing any existing entry
    async fn put(&self, key: &str, response: CachedResponse) -> CacheResult<()>;

    /// Remove a single entry
    async fn evict(&self, key: &str) -> CacheResult<()>;

    /// Remove every entry in this tier
    async fn evict_all(&self) -> CacheResult<()>;
}
