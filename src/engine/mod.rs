//! The data-fetch engine
//!
//! One `Engine` per process owns all shared state: the HTTP client pool, the
//! response cache, the in-flight table, the native resolver registry and the
//! output sink. Everything is reached through this struct; there are no
//! package-level globals. An external scheduler calls
//! [`Engine::execute_instance`] once per instance per refresh interval; the
//! engine has no timer of its own and never blocks the caller.

mod orchestrator;
mod outputs;
mod step;

use std::sync::Arc;

use crate::cache::{InflightTable, ResponseCache};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::ClientPool;
use crate::native::NativeRegistry;
use crate::observability::{Metrics, MetricsSnapshot};
use crate::sink::ValueSink;

pub struct Engine {
    config: Config,
    pool: ClientPool,
    cache: ResponseCache,
    inflight: Arc<InflightTable>,
    natives: NativeRegistry,
    sink: Arc<dyn ValueSink>,
    metrics: Arc<Metrics>,
}

impl Engine {
    pub fn new(config: Config, sink: Arc<dyn ValueSink>) -> Result<Self> {
        Self::with_natives(config, sink, NativeRegistry::new())
    }

    pub fn with_natives(
        config: Config,
        sink: Arc<dyn ValueSink>,
        natives: NativeRegistry,
    ) -> Result<Self> {
        let pool = ClientPool::new(config.http.clone())?;
        let cache = ResponseCache::new(config.cache.max_entries, config.cache.evict_fraction);
        Ok(Self {
            config,
            pool,
            cache,
            inflight: Arc::new(InflightTable::new()),
            natives,
            sink,
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn sink(&self) -> &Arc<dyn ValueSink> {
        &self.sink
    }

    pub fn cached_responses(&self) -> usize {
        self.cache.len()
    }
}

/// Deterministic identity of one resolved request: same instance, target,
/// step and resolved URL/body always hash to the same key, which is what the
/// cache and the in-flight table coalesce on.
pub(crate) fn fingerprint(
    instance_id: &str,
    target_suffix: &str,
    step_id: &str,
    url: &str,
    body: &str,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(instance_id.as_bytes());
    hasher.update(target_suffix.as_bytes());
    hasher.update(&[0]);
    hasher.update(step_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(url.as_bytes());
    hasher.update(&[0]);
    hasher.update(body.as_bytes());
    hasher.finalize().to_hex().to_string()
}
