//! Engine error taxonomy
//!
//! Cancellation is deliberately a distinct variant rather than an error kind
//! folded into `Network`: callers must branch on `is_cancellation()` before
//! deciding whether a failure warrants client-pool recovery.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Caller-initiated abandonment. Never logged as an error and never
    /// followed by output mutation.
    #[error("execution cancelled")]
    Cancelled,

    /// The request hit a timeout that did not originate from the caller's
    /// cancellation token. Treated as a network failure.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection, DNS or TLS level failure.
    #[error("network failure: {0}")]
    Network(String),

    /// Non-2xx response. A hard failure: the body is never cached or
    /// extracted, so error pages cannot poison the cache.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Malformed response or extraction/transform mismatch. A data problem,
    /// not a connectivity problem; does not trigger pool recovery.
    #[error("parse failure: {0}")]
    Parse(String),

    /// A built-in resolver refused or failed the request.
    #[error("native resolver '{host}': {message}")]
    Native { host: String, message: String },

    /// The resolved request could not be constructed (bad URL, bad proxy).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    /// Network-class failures trigger HTTP client pool recovery.
    pub fn is_network_class(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout(_) | EngineError::Network(_) | EngineError::Status { .. }
        )
    }
}
