use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cache.evict_fraction must be in (0, 1], got {0}")]
    EvictFractionOutOfRange(f64),

    #[error("cache.max_entries must be greater than zero")]
    ZeroCacheCapacity,

    #[error("http.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("http.user_agent must not be empty")]
    EmptyUserAgent,
}

pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if !(config.cache.evict_fraction > 0.0 && config.cache.evict_fraction <= 1.0) {
        return Err(ValidationError::EvictFractionOutOfRange(
            config.cache.evict_fraction,
        ));
    }
    if config.cache.max_entries == 0 {
        return Err(ValidationError::ZeroCacheCapacity);
    }
    if config.http.connect_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout("connect_timeout_ms"));
    }
    if config.http.request_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout("request_timeout_ms"));
    }
    if config.http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }
    Ok(())
}
