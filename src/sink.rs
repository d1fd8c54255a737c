//! Output sink contract
//!
//! The sink is the shared key/value store the renderer reads. The engine
//! only ever reads-before-writes (to suppress redundant downstream
//! invalidation) and publishes resolved values under a fixed key convention:
//!
//! - values:       `{instance_id}{target_suffix}.{output_key}`
//! - color state:  value key + `.Color`
//! - unit:         value key + `.Unit`
//! - labels:       `Label.` + value key (short form adds `.Short`)
//!
//! An empty resolved value publishes as [`VALUE_EMPTY`]; a failed chain
//! publishes [`VALUE_ERROR`] for every declared output.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of the label namespace.
pub const LABEL_PREFIX: &str = "Label.";
pub const COLOR_SUFFIX: &str = ".Color";
pub const UNIT_SUFFIX: &str = ".Unit";
pub const SHORT_SUFFIX: &str = ".Short";

/// Published when a value template resolves to an empty string.
pub const VALUE_EMPTY: &str = "-";
/// Published for every output of a failed target chain.
pub const VALUE_ERROR: &str = "Error";

pub trait ValueSink: Send + Sync {
    fn get_value(&self, key: &str) -> Option<String>;
    fn inject_value(&self, key: &str, value: &str);
}

/// In-memory sink for tests and embedders without a renderer store.
#[derive(Debug, Default)]
pub struct MemorySink {
    values: DashMap<String, String>,
    writes: AtomicU64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `inject_value` calls that reached the sink; lets tests
    /// assert that unchanged values were write-suppressed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.iter().map(|e| e.key().clone()).collect()
    }
}

impl ValueSink for MemorySink {
    fn get_value(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }

    fn inject_value(&self, key: &str, value: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.values.insert(key.to_string(), value.to_string());
    }
}
