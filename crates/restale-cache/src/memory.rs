//! Bounded in-process cache level
//!
//! Uses `DashMap` for concurrent access with minimal lock contention and
//! an LRU eviction policy driven by atomic access timestamps.

use crate::{
    config::CacheConfig,
    error::CacheResult,
    level::CacheLevel,
    response::CachedResponse,
    stats::CacheStats,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Entry wrapper with an atomic access timestamp for LRU tracking
#[derive(Debug)]
struct MemoryEntry {
    response: CachedResponse,
    last_accessed: AtomicU64,
}

impl MemoryEntry {
    fn new(response: CachedResponse) -> Self {
        Self {
            response,
            last_accessed: AtomicU64::new(now_nanos()),
        }
    }

    fn touch(&self) {
        self.last_accessed.store(now_nanos(), Ordering::Relaxed);
    }

    fn last_accessed(&self) -> u64 {
        self.last_accessed.load(Ordering::Relaxed)
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// In-process cache level with a fixed maximum entry count
///
/// When full, the least-recently-used entry is evicted to make room.
/// Expired entries are kept until evicted; staleness is the cascade's
/// concern, not the level's.
pub struct MemoryLevel {
    name: String,
    max_entries: usize,
    storage: DashMap<String, Arc<MemoryEntry>>,
    stats: CacheStats,
}

impl MemoryLevel {
    /// Create a memory level from a validated configuration
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;

        Ok(Self {
            name: config.name.clone(),
            max_entries: config.max_entries,
            storage: DashMap::with_capacity(config.max_entries.min(1024)),
            stats: CacheStats::new(),
        })
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the level holds no entries
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Hit/miss/eviction counters for this level
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Evict least-recently-used entries until the level is within bounds
    fn evict_to_capacity(&self) {
        while self.storage.len() > self.max_entries {
            let oldest = self
                .storage
                .iter()
                .min_by_key(|entry| entry.value().last_accessed())
                .map(|entry| entry.key().clone());

            let Some(key) = oldest else { break };
            if self.storage.remove(&key).is_some() {
                self.stats.record_eviction();
                trace!("Evicted LRU entry '{key}' from memory level '{}'", self.name);
            }
        }
    }
}

#[async_trait]
impl CacheLevel for MemoryLevel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        match self.storage.get(key) {
            Some(entry) => {
                entry.touch();
                self.stats.record_hit();
                Ok(Some(entry.response.clone()))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, response: CachedResponse) -> CacheResult<()> {
        self.storage
            .insert(key.to_string(), Arc::new(MemoryEntry::new(response)));
        self.evict_to_capacity();
        Ok(())
    }

    async fn evict(&self, key: &str) -> CacheResult<()> {
        self.storage.remove(key);
        Ok(())
    }

    async fn evict_all(&self) -> CacheResult<()> {
        self.storage.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::freshness::Freshness;
    use bytes::Bytes;

    fn level(max_entries: usize) -> MemoryLevel {
        MemoryLevel::new(&CacheConfig::new("test").with_max_entries(max_entries)).unwrap()
    }

    fn response(body: &'static [u8]) -> CachedResponse {
        CachedResponse::new(
            200,
            vec![],
            Bytes::from_static(body),
            Freshness::new(0, 60, 0, 0, SystemTime::now()),
        )
    }

    #[tokio::test]
    async fn test_get_put_round_trip() {
        let level = level(8);
        assert!(level.get("http://example.com/a").await.unwrap().is_none());

        level
            .put("http://example.com/a", response(b"payload"))
            .await
            .unwrap();
        let hit = level.get("http://example.com/a").await.unwrap().unwrap();
        assert_eq!(hit.body().as_ref(), b"payload");
        assert_eq!(level.stats().hits(), 1);
        assert_eq!(level.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_at_capacity() {
        let level = level(2);
        level.put("a", response(b"1")).await.unwrap();
        // Ensure distinct access timestamps
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        level.put("b", response(b"2")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        // Touch "a" so "b" becomes the LRU candidate
        let _ = level.get("a").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        level.put("c", response(b"3")).await.unwrap();
        assert_eq!(level.len(), 2);
        assert!(level.get("a").await.unwrap().is_some());
        assert!(level.get("b").await.unwrap().is_none());
        assert!(level.get("c").await.unwrap().is_some());
        assert_eq!(level.stats().evictions(), 1);
    }

    #[tokio::test]
    async fn test_evict_all_is_idempotent() {
        let level = level(8);
        level.put("a", response(b"1")).await.unwrap();
        level.put("b", response(b"2")).await.unwrap();

        level.evict_all().await.unwrap();
        assert!(level.is_empty());
        assert!(level.get("a").await.unwrap().is_none());
        assert!(level.get("b").await.unwrap().is_none());

        // A second pass is a no-op
        level.evict_all().await.unwrap();
        assert!(level.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let level = level(4);
        level.put("a", response(b"old")).await.unwrap();
        level.put("a", response(b"new")).await.unwrap();
        let hit = level.get("a").await.unwrap().unwrap();
        assert_eq!(hit.body().as_ref(), b"new");
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(MemoryLevel::new(&CacheConfig::new("x").with_max_entries(0)).is_err());
    }
}
