//! Per-source freshness cache.
//!
//! One [`ResolvedSource`] per source id, served while younger than the TTL.
//! A single async mutex guards the map; concurrent resolutions of the same
//! source may both miss and both write, which is harmless because
//! re-resolving a source is idempotent.

use crate::models::ResolvedSource;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ResolvedSource,
    stored_at: Instant,
}

/// Time-to-live store keyed by source id.
#[derive(Debug)]
pub struct Cache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Cache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored value for `source_id` if it is still fresh.
    ///
    /// Expired entries stay in the map until overwritten or invalidated.
    pub async fn get(&self, source_id: &str) -> Option<ResolvedSource> {
        let entries = self.entries.lock().await;
        let entry = entries.get(source_id)?;
        if entry.stored_at.elapsed() < self.ttl {
            debug!(source_id, "Cache hit");
            Some(entry.value.clone())
        } else {
            debug!(source_id, "Cache entry expired");
            None
        }
    }

    /// Store `value` under its source id, replacing any previous entry.
    pub async fn put(&self, value: ResolvedSource) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.entries
            .lock()
            .await
            .insert(entry.value.source_id.clone(), entry);
    }

    pub async fn invalidate(&self, source_id: &str) {
        self.entries.lock().await.remove(source_id);
    }

    pub async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
