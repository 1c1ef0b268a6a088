//! Remote cache tiers backed by external key/value stores
//!
//! The actual protocol clients (a key/value store, a memcached-protocol
//! client) live outside this crate; both expose the identical narrow
//! contract captured by [`RemoteStore`]. [`RemoteLevel`] adapts any such
//! store into a [`CacheLevel`], JSON-encoding the response representation.

use crate::{
    error::CacheResult,
    level::CacheLevel,
    response::CachedResponse,
};
use async_trait::async_trait;
use bytes::Bytes;

/// The narrow contract consumed from external key/value backends
///
/// Implementations wrap a remote protocol client; errors should be mapped
/// into [`crate::CacheError::Backend`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the raw bytes stored under the key, if any
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>>;

    /// Store raw bytes under the key
    async fn put(&self, key: &str, value: Bytes) -> CacheResult<()>;

    /// Delete the entry under the key
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every entry in the store
    async fn flush(&self) -> CacheResult<()>;
}

/// A cache level backed by a remote store
pub struct RemoteLevel<S> {
    name: String,
    store: S,
}

impl<S: RemoteStore> RemoteLevel<S> {
    /// Wrap a remote store as a cache level
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: RemoteStore> CacheLevel for RemoteLevel<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, response: CachedResponse) -> CacheResult<()> {
        let encoded = serde_json::to_vec(&response)?;
        self.store.put(key, Bytes::from(encoded)).await
    }

    async fn evict(&self, key: &str) -> CacheResult<()> {
        self.store.delete(key).await
    }

    async fn evict_all(&self) -> CacheResult<()> {
        self.store.flush().await
    }
}
