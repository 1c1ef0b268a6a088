//! Error types for the restale-cache crate

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Error types for cache operations
///
/// All variants carry owned data so the error is `Clone`; completions may be
/// observed by multiple waiters and each receives its own copy.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Invalid cache or cascade configuration, fatal at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A remote store backend failed
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A cached entry could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// The cache worker pool rejected the submission
    #[error("Cache pool queue is saturated")]
    PoolSaturated,
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
