//! Cache-aware HTTP client with retry/backoff and freshness semantics
//!
//! This crate provides the execution half of restale:
//! - A [`Transport`] trait over the wire-level HTTP collaborator, with a
//!   reqwest-backed implementation
//! - A polymorphic [`RetryPolicy`] (never, fixed, exponential with jitter)
//! - The request continuation: the state machine that decides whether to
//!   serve from cache, revalidate in the background, retry, or fall back
//!   to stale data on error
//! - [`CachedClient`], the user-facing cache-aware client

pub mod client;
mod continuation;
pub mod error;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::{CachedClient, CachedClientBuilder, RequestHandle};
pub use error::{Error, Result, SharedResult};
pub use request::Request;
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};

// Cache types that appear in this crate's public API
pub use restale_cache::{CacheCascade, CacheConfig, CachedResponse, Freshness};

// HTTP method type used by requests and retry policies
pub use reqwest::Method;
