//! Named cache buckets for fetched query results
//!
//! List screens cache their pages under a bucket name (usually the entity
//! name). A successful mutation invalidates the whole bucket so the next
//! render refetches.

use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::events::{events::CacheInvalidated, EventBus};

type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Bucket {
    entries: AHashMap<String, CachedValue>,
    invalidations: u64,
}

/// Query result cache grouped by bucket
pub struct QueryCache {
    buckets: Arc<RwLock<AHashMap<String, Bucket>>>,
    /// Maximum number of entries per bucket
    max_entries: usize,
    events: Option<Arc<EventBus>>,
}

impl QueryCache {
    /// Create a new cache
    pub fn new(max_entries: usize) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(AHashMap::new())),
            max_entries,
            events: None,
        }
    }

    /// Publish a [`CacheInvalidated`] event for every invalidation
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Get a cached value; `None` when absent or stored with another type
    pub fn get<T: Any + Send + Sync + Clone>(&self, bucket: &str, key: &str) -> Option<T> {
        let buckets = self.buckets.read();
        buckets
            .get(bucket)
            .and_then(|b| b.entries.get(key))
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Put a value in the cache
    pub fn put<T: Any + Send + Sync>(&self, bucket: &str, key: &str, value: T) {
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(bucket.to_string()).or_default();

        // Simple eviction if at capacity
        if bucket.entries.len() >= self.max_entries && !bucket.entries.contains_key(key) {
            if let Some(victim) = bucket.entries.keys().next().cloned() {
                bucket.entries.remove(&victim);
            }
        }

        bucket.entries.insert(key.to_string(), Arc::new(value));
    }

    /// Drop every entry of a bucket. Returns the number of evicted entries.
    pub fn invalidate(&self, bucket: &str) -> usize {
        let evicted = {
            let mut buckets = self.buckets.write();
            let bucket = buckets.entry(bucket.to_string()).or_default();
            bucket.invalidations += 1;
            let evicted = bucket.entries.len();
            bucket.entries.clear();
            evicted
        };
        debug!(bucket, evicted, "cache bucket invalidated");

        if let Some(events) = &self.events {
            events.publish(CacheInvalidated {
                bucket: bucket.to_string(),
                evicted,
            });
        }
        evicted
    }

    /// How many times a bucket has been invalidated
    pub fn invalidation_count(&self, bucket: &str) -> u64 {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.invalidations)
            .unwrap_or(0)
    }

    /// Number of entries currently held by a bucket
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.entries.len())
            .unwrap_or(0)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.buckets.write().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(64)
    }
}
