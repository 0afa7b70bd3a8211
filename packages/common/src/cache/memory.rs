use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;

use super::{CacheError, CacheStore};
use crate::config::CacheAppConfig;

/// In-process TTL cache backed by moka.
///
/// Generations live in a separate map without eviction, so a key never
/// falls back to a generation a reader may already have observed.
pub struct MemoryCache {
    entries: Cache<String, Arc<Value>>,
    generations: Cache<String, u64>,
    clock: AtomicU64,
}

impl MemoryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            generations: Cache::builder().build(),
            clock: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheAppConfig) -> Self {
        Self::new(config.max_capacity, Duration::from_secs(config.ttl_secs))
    }

    async fn current(&self, key: &str) -> u64 {
        self.generations.get(key).await.unwrap_or(0)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<Value>>, CacheError> {
        Ok(self.entries.get(key).await)
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self.current(key).await)
    }

    async fn insert(&self, key: &str, value: Value, generation: u64) -> Result<bool, CacheError> {
        if self.current(key).await != generation {
            return Ok(false);
        }
        self.entries.insert(key.to_string(), Arc::new(value)).await;
        // An invalidation may have landed between the check and the insert.
        if self.current(key).await != generation {
            self.entries.invalidate(key).await;
            return Ok(false);
        }
        Ok(true)
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let next = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(key.to_string(), next).await;
        self.entries.invalidate(key).await;
        Ok(())
    }
}
