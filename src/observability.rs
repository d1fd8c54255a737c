//! Engine counters
//!
//! Cheap atomic counters, snapshotted for assertions and periodic logging.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    network_calls: AtomicU64,
    cache_hits: AtomicU64,
    coalesced_joins: AtomicU64,
    pool_resets: AtomicU64,
    targets_succeeded: AtomicU64,
    targets_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network_call(&self) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn coalesced_join(&self) {
        self.coalesced_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pool_reset(&self) {
        self.pool_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn target_succeeded(&self) {
        self.targets_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn target_failed(&self) {
        self.targets_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            network_calls: self.network_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced_joins: self.coalesced_joins.load(Ordering::Relaxed),
            pool_resets: self.pool_resets.load(Ordering::Relaxed),
            targets_succeeded: self.targets_succeeded.load(Ordering::Relaxed),
            targets_failed: self.targets_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub network_calls: u64,
    pub cache_hits: u64,
    pub coalesced_joins: u64,
    pub pool_resets: u64,
    pub targets_succeeded: u64,
    pub targets_failed: u64,
}
