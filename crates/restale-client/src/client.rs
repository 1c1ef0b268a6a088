//! Cache-aware HTTP client
//!
//! Wraps a [`Transport`] with a [`CacheCascade`], a [`RetryPolicy`] and a
//! background revalidation pool. Requests can run inline
//! ([`CachedClient::execute`]) or detached ([`CachedClient::execute_detached`]),
//! in which case the caller gets a [`RequestHandle`] it can await, share or
//! cancel.

use crate::{
    continuation::RequestContinuation,
    error::{Result, SharedResult},
    request::Request,
    retry::RetryPolicy,
    transport::{ReqwestTransport, Transport},
};
use restale_cache::{
    CacheCascade, CacheConfig, CachedResponse, CascadeBuilder, Completion, MemoryLevel,
    RevalidationPool,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::debug;

struct ClientInner {
    transport: Arc<dyn Transport>,
    cascade: CacheCascade,
    retry_policy: RetryPolicy,
    revalidation: Arc<RevalidationPool>,
    allow_stale_response: bool,
}

/// HTTP client that serves from a cache cascade when it can
///
/// Cheap to clone; all clones share the same transport, cascade and
/// revalidation pool.
#[derive(Clone)]
pub struct CachedClient {
    inner: Arc<ClientInner>,
}

impl CachedClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self> {
        CachedClientBuilder::new().build()
    }

    /// Start building a customized client
    pub fn builder() -> CachedClientBuilder {
        CachedClientBuilder::new()
    }

    /// Execute a request inline and wait for its outcome
    ///
    /// Serves from the cascade when the cached entry is fresh or within
    /// its revalidate window, otherwise fetches remotely with the
    /// configured retry policy and stale-fallback rules.
    pub async fn execute(&self, request: Request) -> Result<CachedResponse> {
        self.continuation(request, Arc::new(AtomicBool::new(false)))
            .run()
            .await
    }

    /// Execute a request on a background task
    ///
    /// The returned handle can be cloned for multiple observers and
    /// supports cancellation. A cancelled request resolves to
    /// [`Error::Cancelled`](crate::Error::Cancelled) even if the fetch itself succeeds.
    pub fn execute_detached(&self, request: Request) -> RequestHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let completion: Completion<SharedResult> = Completion::new();

        let continuation = self.continuation(request, Arc::clone(&cancelled));
        let task_completion = completion.clone();
        tokio::spawn(async move {
            let outcome = continuation.run().await.map_err(Arc::new);
            task_completion.fulfill(outcome);
        });

        RequestHandle {
            completion,
            cancelled,
        }
    }

    /// Evict a single cached entry from every level
    pub async fn evict(&self, url: &str) {
        self.inner.cascade.evict(url).await;
    }

    /// Evict every cached entry from every level
    pub async fn evict_all(&self) {
        self.inner.cascade.evict_all().await;
    }

    /// The cache cascade backing this client
    pub fn cascade(&self) -> &CacheCascade {
        &self.inner.cascade
    }

    fn continuation(&self, request: Request, cancelled: Arc<AtomicBool>) -> RequestContinuation {
        RequestContinuation::new(
            request,
            Arc::clone(&self.inner.transport),
            self.inner.cascade.clone(),
            self.inner.retry_policy.clone(),
            Arc::clone(&self.inner.revalidation),
            self.inner.allow_stale_response,
            cancelled,
        )
    }
}

/// Builder for [`CachedClient`]
pub struct CachedClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    cascade: Option<CacheCascade>,
    cache_config: CacheConfig,
    retry_policy: RetryPolicy,
    revalidation: Option<Arc<RevalidationPool>>,
}

impl CachedClientBuilder {
    /// Create a builder with defaults
    pub fn new() -> Self {
        Self {
            transport: None,
            cascade: None,
            cache_config: CacheConfig::new("client"),
            retry_policy: RetryPolicy::never(),
            revalidation: None,
        }
    }

    /// Use a custom transport instead of the bundled reqwest one
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use an explicit cache cascade
    ///
    /// Overrides [`cache_config`](Self::cache_config)'s memory level.
    pub fn cascade(mut self, cascade: CacheCascade) -> Self {
        self.cascade = Some(cascade);
        self
    }

    /// Configure the default single-level in-memory cache
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Set the retry policy (default: never retry)
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Use a shared revalidation pool instead of a private default one
    pub fn revalidation_pool(mut self, pool: Arc<RevalidationPool>) -> Self {
        self.revalidation = Some(pool);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CachedClient> {
        let allow_stale_response = self.cache_config.allow_stale_response;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?) as Arc<dyn Transport>,
        };

        let cascade = match self.cascade {
            Some(cascade) => cascade,
            None => {
                let level = MemoryLevel::new(&self.cache_config)?;
                CascadeBuilder::new().level(Arc::new(level)).build()?
            }
        };

        let revalidation = self
            .revalidation
            .unwrap_or_else(|| Arc::new(RevalidationPool::new()));

        Ok(CachedClient {
            inner: Arc::new(ClientInner {
                transport,
                cascade,
                retry_policy: self.retry_policy,
                revalidation,
                allow_stale_response,
            }),
        })
    }
}

impl Default for CachedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a detached request
///
/// Clones share the same outcome slot and cancellation flag, so any
/// number of observers can wait on one request.
#[derive(Clone)]
pub struct RequestHandle {
    completion: Completion<SharedResult>,
    cancelled: Arc<AtomicBool>,
}

impl RequestHandle {
    /// Wait for the request outcome
    pub async fn wait(&self) -> SharedResult {
        self.completion.wait().await
    }

    /// The outcome, if already delivered
    pub fn try_get(&self) -> Option<SharedResult> {
        self.completion.try_get()
    }

    /// Whether the request has finished
    pub fn is_finished(&self) -> bool {
        self.completion.is_fulfilled()
    }

    /// Request cancellation
    ///
    /// Best-effort: an in-flight fetch is not interrupted mid-wire, but
    /// the outcome is suppressed and observers see [`Error::Cancelled`](crate::Error::Cancelled).
    pub fn cancel(&self) {
        debug!("Cancellation requested for detached request");
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_defaults() {
        let client = CachedClient::new().unwrap();
        assert!(client.inner.allow_stale_response);
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_cache_config() {
        let result = CachedClient::builder()
            .cache_config(CacheConfig::new("client").with_max_entries(0))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_allow_stale_flag_carried_from_config() {
        let client = CachedClient::builder()
            .cache_config(CacheConfig::new("client").with_allow_stale_response(false))
            .build()
            .unwrap();
        assert!(!client.inner.allow_stale_response);
    }
}
