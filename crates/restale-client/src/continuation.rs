//! The request continuation
//!
//! Coordinates a single logical cache-aware request from cache lookup
//! through remote fetch, retry, write-back and stale-fallback
//! reconciliation to exactly-once delivery:
//!
//! 1. No cached entry: fetch remote directly, no fallback.
//! 2. Entry fresh: serve it immediately.
//! 3. Entry expired but inside its revalidate window: serve the stale
//!    entry immediately and refresh it on the revalidation pool.
//! 4. Entry expired beyond the revalidate window: fetch remote with the
//!    stale entry armed as an error-fallback candidate.
//! 5. Cache lookup failure: same as 1 (the cascade already degrades
//!    failures to a miss).
//!
//! Retry waits use a timer (`tokio::time::sleep`) instead of parking a
//! worker; attempts for one request stay strictly sequential.

use crate::{
    error::{Error, Result},
    request::Request,
    retry::RetryPolicy,
    transport::Transport,
};
use restale_cache::{CacheCascade, CachedResponse, RevalidationPool};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

/// In-flight state for one logical request
pub(crate) struct RequestContinuation {
    request: Request,
    transport: Arc<dyn Transport>,
    cascade: CacheCascade,
    retry_policy: RetryPolicy,
    revalidation: Arc<RevalidationPool>,
    allow_stale_response: bool,
    /// Attempts made so far; owned exclusively by this continuation
    attempt: u32,
    cancelled: Arc<AtomicBool>,
}

impl RequestContinuation {
    pub(crate) fn new(
        request: Request,
        transport: Arc<dyn Transport>,
        cascade: CacheCascade,
        retry_policy: RetryPolicy,
        revalidation: Arc<RevalidationPool>,
        allow_stale_response: bool,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            request,
            transport,
            cascade,
            retry_policy,
            revalidation,
            allow_stale_response,
            attempt: 0,
            cancelled,
        }
    }

    /// Drive the request to a single delivered outcome
    pub(crate) async fn run(mut self) -> Result<CachedResponse> {
        let key = self.request.cache_key().to_string();

        let fallback = match self.cascade.get(&key).await {
            Some(entry) if !entry.freshness().is_expired() => {
                debug!("Serving fresh cached response for '{key}'");
                return self.deliver(Ok(entry));
            }
            Some(entry) if entry.freshness().is_fresh_for_revalidate() => {
                debug!("Serving stale response for '{key}', scheduling background revalidation");
                self.schedule_revalidation(&key);
                return self.deliver(Ok(entry));
            }
            Some(entry) => {
                trace!("Cached entry for '{key}' expired beyond revalidate window, arming as error fallback");
                Some(entry)
            }
            None => None,
        };

        let outcome = self.fetch_with_retry(&key, fallback).await;
        self.deliver(outcome)
    }

    /// Gate delivery on the cancellation flag
    fn deliver(&self, outcome: Result<CachedResponse>) -> Result<CachedResponse> {
        if self.cancelled.load(Ordering::Acquire) {
            debug!(
                "Suppressing delivery for cancelled request to '{}'",
                self.request.cache_key()
            );
            return Err(Error::Cancelled);
        }
        outcome
    }

    /// Remote fetch with retry, write-back and stale-fallback reconciliation
    async fn fetch_with_retry(
        &mut self,
        key: &str,
        fallback: Option<CachedResponse>,
    ) -> Result<CachedResponse> {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return Err(Error::Cancelled);
            }

            match self.transport.fetch(&self.request).await {
                Ok(response) => {
                    let decision = self.retry_policy.decide(
                        self.request.method(),
                        Some(response.status()),
                        false,
                        self.attempt,
                    );
                    if decision.retry {
                        debug!(
                            "Request to '{key}' returned status {}, retrying after {:?} (attempt {})",
                            response.status(),
                            decision.delay,
                            self.attempt + 1
                        );
                        sleep(decision.delay).await;
                        self.attempt += 1;
                        continue;
                    }

                    return Ok(self.reconcile(key, response, fallback.as_ref()).await);
                }
                Err(err) => {
                    let decision = self.retry_policy.decide(
                        self.request.method(),
                        None,
                        true,
                        self.attempt,
                    );
                    if decision.retry {
                        warn!(
                            "Request to '{key}' failed ({err}), retrying after {:?} (attempt {})",
                            decision.delay,
                            self.attempt + 1
                        );
                        sleep(decision.delay).await;
                        self.attempt += 1;
                        continue;
                    }

                    if let Some(candidate) = fallback {
                        if candidate.freshness().is_fresh_for_error() {
                            debug!(
                                "Delivering stale fallback for '{key}' after fetch failure: {err}"
                            );
                            return Ok(candidate);
                        }
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Apply the write-back and stale-if-error rules to a terminal response
    async fn reconcile(
        &self,
        key: &str,
        response: CachedResponse,
        fallback: Option<&CachedResponse>,
    ) -> CachedResponse {
        let freshness = response.freshness();
        let usable = !freshness.is_expired()
            || (self.allow_stale_response && freshness.is_fresh_for_revalidate());

        if !usable && response.is_server_error() && self.allow_stale_response {
            if let Some(candidate) = fallback {
                if candidate.freshness().is_fresh_for_error() && !candidate.is_server_error() {
                    debug!(
                        "Serving stale fallback for '{key}' instead of fresh status {}",
                        response.status()
                    );
                    return candidate.clone();
                }
            }
        }

        // Successful results are always written back before delivery
        if response.is_success() {
            self.cascade.put(key, response.clone()).await;
        }
        response
    }

    /// Enqueue a best-effort background refresh for a stale entry
    fn schedule_revalidation(&self, key: &str) {
        let transport = Arc::clone(&self.transport);
        let cascade = self.cascade.clone();
        let request = self.request.clone();
        let key = key.to_string();

        self.revalidation.submit(Box::pin(async move {
            revalidate(transport, cascade, request, key).await;
        }));
    }
}

/// Background stale revalidation
///
/// Re-checks the cache first so concurrent revalidations of the same key
/// do not duplicate work, then performs a single fetch (no retry) and
/// writes a 2xx result through the cascade. Errors are logged and
/// discarded; no caller is waiting on this path.
async fn revalidate(
    transport: Arc<dyn Transport>,
    cascade: CacheCascade,
    request: Request,
    key: String,
) {
    if let Some(entry) = cascade.get(&key).await {
        if !entry.freshness().is_expired() {
            trace!("Revalidation for '{key}' skipped, cache already refreshed");
            return;
        }
    }

    match transport.fetch(&request).await {
        Ok(response) if response.is_success() => {
            cascade.put(&key, response).await;
            debug!("Background revalidation refreshed '{key}'");
        }
        Ok(response) => {
            debug!(
                "Background revalidation for '{key}' returned status {}, discarding",
                response.status()
            );
        }
        Err(err) => {
            debug!("Background revalidation for '{key}' failed: {err}");
        }
    }
}
