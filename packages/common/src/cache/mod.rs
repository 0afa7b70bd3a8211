mod memory;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub use memory::MemoryCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Read-through cache for derived read views, keyed by logical resource name.
///
/// Entries carry a bounded freshness (TTL); writers call [`invalidate`]
/// after committing a change so the next read recomputes the view. Each
/// invalidation moves the key to a new generation, and a fill computed under
/// an older generation is discarded.
///
/// [`invalidate`]: CacheStore::invalidate
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<Value>>, CacheError>;

    /// Current generation of `key`.
    async fn generation(&self, key: &str) -> Result<u64, CacheError>;

    /// Store `value` if `key` is still at `generation`. Returns whether the
    /// value was kept.
    async fn insert(&self, key: &str, value: Value, generation: u64) -> Result<bool, CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Serve `key` from `cache`, or compute it with `load` and fill the cache.
///
/// The generation is read before `load` runs, so a view computed from rows
/// that a concurrent write has since replaced is returned to this caller but
/// never cached. Cache failures degrade to an uncached read.
pub async fn read_through<V, E, F, Fut>(cache: &dyn CacheStore, key: &str, load: F) -> Result<V, E>
where
    V: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    match cache.get(key).await {
        Ok(Some(hit)) => match serde_json::from_value((*hit).clone()) {
            Ok(view) => {
                debug!(cache_key = %key, "Cache hit");
                return Ok(view);
            }
            Err(e) => warn!(cache_key = %key, error = %e, "Discarding undecodable cache entry"),
        },
        Ok(None) => debug!(cache_key = %key, "Cache miss"),
        Err(e) => warn!(cache_key = %key, error = %e, "Cache read failed; reading from store"),
    }

    let generation = match cache.generation(key).await {
        Ok(generation) => Some(generation),
        Err(e) => {
            warn!(cache_key = %key, error = %e, "Cache generation unavailable; not caching");
            None
        }
    };

    let view = load().await?;

    let Some(generation) = generation else {
        return Ok(view);
    };
    match serde_json::to_value(&view) {
        Ok(value) => match cache.insert(key, value, generation).await {
            Ok(true) => {}
            Ok(false) => debug!(cache_key = %key, "Invalidated during read; not caching"),
            Err(e) => warn!(cache_key = %key, error = %e, "Failed to populate cache"),
        },
        Err(e) => warn!(cache_key = %key, error = %e, "Failed to encode view for cache"),
    }
    Ok(view)
}
