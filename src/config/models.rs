use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Accept self-signed/invalid TLS certificates. Defaults to true because
    /// polled endpoints are user-supplied and frequently misconfigured; see
    /// the security caveat on the client pool.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    concat!("pollkit/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_accept_invalid_certs() -> bool {
    true
}

/// Response cache limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Entry count at which the oldest slice is evicted before inserting.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Fraction of `max_entries` dropped per eviction pass.
    #[serde(default = "default_evict_fraction")]
    pub evict_fraction: f64,
    /// Bodies larger than this are never cached.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            evict_fraction: default_evict_fraction(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_entries() -> usize {
    100
}

fn default_evict_fraction() -> f64 {
    0.2
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize(500 * 1024) // 500 KB
}

/// Fan-out pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Delay between consecutive target starts within one instance, so a
    /// multi-target instance does not stampede a single upstream host.
    #[serde(default = "default_target_stagger_ms")]
    pub target_stagger_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_stagger_ms: default_target_stagger_ms(),
        }
    }
}

fn default_target_stagger_ms() -> u64 {
    50
}
