//! Cascading multi-level cache
//!
//! Composes an ordered chain of cache levels from fastest to slowest.
//! Lookups walk the chain front to back, promoting usable lower-tier hits
//! into the faster tiers; writes go through every tier. Per-tier failures
//! are always swallowed and logged at the cascade boundary; they degrade
//! to a miss or a no-op write, never to a caller-visible error.

use crate::{
    completion::Completion,
    error::{CacheError, CacheResult},
    level::CacheLevel,
    pool::CachePool,
    response::CachedResponse,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

struct CascadeInner {
    levels: Vec<Arc<dyn CacheLevel>>,
    pool: Option<CachePool>,
}

/// An ordered chain of cache levels, fast to slow
///
/// Topology is fixed at construction via [`CascadeBuilder`]. The cascade
/// holds no mutable shared state beyond the level chain itself; levels
/// guarantee their own concurrent safety. Clones share the same chain.
#[derive(Clone)]
pub struct CacheCascade {
    inner: Arc<CascadeInner>,
}

impl CacheCascade {
    /// Start building a cascade
    pub fn builder() -> CascadeBuilder {
        CascadeBuilder::new()
    }

    /// Number of levels in the chain
    pub fn level_count(&self) -> usize {
        self.inner.levels.len()
    }

    /// Look up a key across the chain
    ///
    /// The first hit wins. A hit below the first tier is promoted into
    /// every faster tier when it is not fully expired or still within its
    /// revalidate window. Level errors are logged and treated as a miss.
    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        for (index, level) in self.inner.levels.iter().enumerate() {
            match level.get(key).await {
                Ok(Some(response)) => {
                    trace!("Cache hit for '{key}' at level '{}'", level.name());
                    if index > 0 {
                        self.promote(key, &response, index).await;
                    }
                    return Some(response);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "Cache level '{}' failed during get for '{key}', treating as miss: {err}",
                        level.name()
                    );
                }
            }
        }
        trace!("Cache miss for '{key}' across {} levels", self.level_count());
        None
    }

    /// Copy a lower-tier hit into every faster tier
    async fn promote(&self, key: &str, response: &CachedResponse, found_at: usize) {
        let freshness = response.freshness();
        if freshness.is_expired() && !freshness.is_fresh_for_revalidate() {
            trace!("Not promoting '{key}': entry past its revalidate window");
            return;
        }

        for level in &self.inner.levels[..found_at] {
            if let Err(err) = level.put(key, response.clone()).await {
                warn!(
                    "Failed to promote '{key}' into level '{}': {err}",
                    level.name()
                );
            } else {
                debug!("Promoted '{key}' into level '{}'", level.name());
            }
        }
    }

    /// Write a response through every tier
    ///
    /// Failures at any tier, including the first, are logged and swallowed;
    /// a slow-tier write failure never fails the overall put.
    pub async fn put(&self, key: &str, response: CachedResponse) {
        for level in &self.inner.levels {
            if let Err(err) = level.put(key, response.clone()).await {
                warn!(
                    "Cache level '{}' failed during put for '{key}': {err}",
                    level.name()
                );
            }
        }
    }

    /// Remove a key from every tier
    pub async fn evict(&self, key: &str) {
        for level in &self.inner.levels {
            if let Err(err) = level.evict(key).await {
                warn!(
                    "Cache level '{}' failed during evict for '{key}': {err}",
                    level.name()
                );
            }
        }
    }

    /// Clear every tier
    pub async fn evict_all(&self) {
        for level in &self.inner.levels {
            if let Err(err) = level.evict_all().await {
                warn!(
                    "Cache level '{}' failed during evict_all: {err}",
                    level.name()
                );
            }
        }
    }

    /// Asynchronous [`Self::get`] executed on the cache pool
    ///
    /// The returned completion is always fulfilled: on submission rejection
    /// the failure is delivered through an unbounded fallback task instead
    /// of being silently dropped.
    pub fn get_async(&self, key: &str) -> Completion<CacheResult<Option<CachedResponse>>> {
        let completion = Completion::new();
        let job = {
            let cascade = self.clone();
            let key = key.to_string();
            let completion = completion.clone();
            Box::pin(async move {
                completion.fulfill(Ok(cascade.get(&key).await));
            })
        };
        self.dispatch(key, job, &completion);
        completion
    }

    /// Asynchronous [`Self::put`] executed on the cache pool
    pub fn put_async(&self, key: &str, response: CachedResponse) -> Completion<CacheResult<()>> {
        let completion = Completion::new();
        let job = {
            let cascade = self.clone();
            let key = key.to_string();
            let completion = completion.clone();
            Box::pin(async move {
                cascade.put(&key, response).await;
                completion.fulfill(Ok(()));
            })
        };
        self.dispatch(key, job, &completion);
        completion
    }

    fn dispatch<T: Clone + Send + 'static>(
        &self,
        key: &str,
        job: crate::pool::Job,
        completion: &Completion<CacheResult<T>>,
    ) {
        let Some(pool) = &self.inner.pool else {
            // No pool configured: run on a detached task
            tokio::spawn(job);
            return;
        };

        if let Err(rejected) = pool.try_submit(job) {
            drop(rejected);
            warn!("Cache pool saturated, rejecting async operation for '{key}'");
            let completion = completion.clone();
            // Fallback unbounded path: the completion is still fulfilled
            tokio::spawn(async move {
                completion.fulfill(Err(CacheError::PoolSaturated));
            });
        }
    }
}

/// Builder for [`CacheCascade`]
///
/// Levels are added fastest first. Building an empty chain is a
/// configuration error.
#[derive(Default)]
pub struct CascadeBuilder {
    levels: Vec<Arc<dyn CacheLevel>>,
    pool: Option<CachePool>,
}

impl CascadeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next (slower) level to the chain
    pub fn level(mut self, level: Arc<dyn CacheLevel>) -> Self {
        self.levels.push(level);
        self
    }

    /// Attach a pool for `get_async`/`put_async` execution
    pub fn cache_pool(mut self, pool: CachePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the cascade, validating the chain
    pub fn build(self) -> CacheResult<CacheCascade> {
        if self.levels.is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "cache cascade requires at least one level".to_string(),
            ));
        }

        Ok(CacheCascade {
            inner: Arc::new(CascadeInner {
                levels: self.levels,
                pool: self.pool,
            }),
        })
    }
}
