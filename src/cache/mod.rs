//! Response caching and request coalescing, both keyed by fingerprint

mod inflight;
mod store;

pub use inflight::InflightTable;
pub use store::ResponseCache;
