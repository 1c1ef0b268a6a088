//! Multi-tier HTTP response caching with freshness semantics
//!
//! This crate provides the caching half of restale:
//! - Freshness metadata derived from `Age` and `Cache-Control` headers
//!   (max-age, stale-while-revalidate, stale-if-error)
//! - A [`CacheLevel`] trait with a bounded in-memory LRU implementation and
//!   an adapter for remote key/value backends
//! - A [`CacheCascade`] composing levels fast-to-slow with promotion on hit
//! - Bounded worker pools with distinct backpressure policies for cache
//!   operations and background stale revalidation

pub mod cascade;
pub mod completion;
pub mod config;
pub mod error;
pub mod freshness;
pub mod level;
pub mod memory;
pub mod pool;
pub mod remote;
pub mod response;
pub mod stats;

pub use cascade::{CacheCascade, CascadeBuilder};
pub use completion::Completion;
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use freshness::Freshness;
pub use level::CacheLevel;
pub use memory::MemoryLevel;
pub use pool::{CachePool, RevalidationPool};
pub use remote::{RemoteLevel, RemoteStore};
pub use response::CachedResponse;
pub use stats::CacheStats;
