//! Response cache for repeated filter queries
//!
//! Entries are tied to the generation of the published view. The first request
//! for a newer view drops every cached response, requests for older views
//! neither read nor write the cache.

use moka::sync::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::handlers::AlertsResponse;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    generation: u64,
    filters: Vec<String>,
}

pub struct ResponseCache {
    cache: Cache<CacheKey, Arc<AlertsResponse>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_config(1000, Duration::from_secs(300))
    }

    pub fn with_config(max_entries: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Advance to `generation`, dropping entries of older views.
    /// Returns false when `generation` is already behind the latest one seen.
    fn sync_generation(&self, generation: u64) -> bool {
        let previous = self.generation.fetch_max(generation, Ordering::SeqCst);
        if generation > previous {
            self.cache.invalidate_all();
        }
        generation >= previous
    }

    pub fn get(&self, generation: u64, filters: &[String]) -> Option<Arc<AlertsResponse>> {
        if !self.sync_generation(generation) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let key = CacheKey {
            generation,
            filters: filters.to_vec(),
        };
        match self.cache.get(&key) {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(response)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, generation: u64, filters: &[String], response: Arc<AlertsResponse>) {
        if !self.sync_generation(generation) {
            return;
        }

        let key = CacheKey {
            generation,
            filters: filters.to_vec(),
        };
        self.cache.insert(key, response);
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            entries: self.cache.entry_count(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
