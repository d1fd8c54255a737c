//! TTL response cache with bounded size
//!
//! Keyed by request fingerprint. Freshness is checked against the step's TTL
//! on read; expired hits are evicted immediately so a refetch repopulates
//! them. When the cache reaches capacity, the oldest-stamped slice of
//! entries is dropped before inserting (eviction by insert timestamp, not
//! true access order).

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    body: String,
    stored_at: Instant,
}

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    evict_fraction: f64,
}

impl ResponseCache {
    pub fn new(max_entries: usize, evict_fraction: f64) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            evict_fraction,
        }
    }

    /// Body for `key` if present and younger than `ttl`. An expired hit is
    /// removed before returning `None`.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() <= ttl {
                return Some(entry.body.clone());
            }
        } else {
            return None;
        }
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: &str, body: String) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict_oldest();
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&self) {
        let count = ((self.max_entries as f64 * self.evict_fraction).ceil() as usize).max(1);

        let mut stamped: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stored_at))
            .collect();
        stamped.sort_by_key(|(_, stored_at)| *stored_at);

        for (key, _) in stamped.into_iter().take(count) {
            self.entries.remove(&key);
        }
        debug!(evicted = count, remaining = self.entries.len(), "cache pruned oldest entries");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Test hook: age an entry by shifting its insert timestamp backwards.
    #[cfg(test)]
    fn backdate(&self, key: &str, by: Duration) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if let Some(earlier) = entry.stored_at.checked_sub(by) {
                entry.stored_at = earlier;
            }
        }
    }
}
