//! pollkit: plugin data-fetch engine
//!
//! Periodically resolves user-authored request templates against a per-target
//! context, fetches over HTTP (or via built-in native resolvers), extracts
//! and transforms fields, and publishes named values into a key/value sink
//! read by a renderer. Fan-out is concurrent per target with request
//! coalescing and TTL caching keyed by resolved-request fingerprint.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod humanize;
pub mod native;
pub mod observability;
pub mod plugin;
pub mod sink;
pub mod template;
pub mod transform;

pub use engine::Engine;
pub use error::EngineError;
