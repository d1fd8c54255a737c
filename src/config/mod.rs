//! Engine configuration
//!
//! Layered loading in the usual order:
//! 1. Default values (embedded in the structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! Environment overrides use the pattern `POLLKIT__<section>__<key>`, e.g.
//! `POLLKIT__CACHE__MAX_ENTRIES=50` or `POLLKIT__HTTP__REQUEST_TIMEOUT_MS=5000`.
//! The file path defaults to `config/pollkit.toml` and can be overridden
//! with the `POLLKIT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{CacheConfig, Config, HttpConfig, SchedulerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path; useful in tests.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
