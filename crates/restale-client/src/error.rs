//! Error types for the restale-client crate

use std::sync::Arc;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a detached request, shareable across multiple observers
pub type SharedResult = std::result::Result<crate::CachedResponse, Arc<Error>>;

/// Error types for cache-aware request execution
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request error from the transport
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cache subsystem error
    #[error("Cache error: {0}")]
    Cache(#[from] restale_cache::CacheError),

    /// Invalid client or policy configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The request was cancelled before delivery
    #[error("Request was cancelled")]
    Cancelled,
}
