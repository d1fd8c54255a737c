//! Built-in ("native") resolver dispatch
//!
//! Steps whose resolved URL uses the reserved `native://` scheme are routed
//! to a registered resolver instead of the HTTP transport. The contract
//! mirrors an HTTP fetch (host plus query arguments in, raw response body
//! out), but no network client or TLS settings apply. Concrete resolvers
//! (geocoding, price lookups, ...) live outside the engine.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Reserved URL scheme for built-in resolvers.
pub const NATIVE_SCHEME: &str = "native";

#[async_trait]
pub trait NativeResolver: Send + Sync {
    async fn resolve(&self, host: &str, args: &[(String, String)]) -> Result<String>;
}

/// Registry mapping `native://` hosts to resolver instances.
#[derive(Clone, Default)]
pub struct NativeRegistry {
    resolvers: BTreeMap<String, Arc<dyn NativeResolver>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, host: impl Into<String>, resolver: Arc<dyn NativeResolver>) {
        self.resolvers.insert(host.into(), resolver);
    }

    pub fn get(&self, host: &str) -> Result<Arc<dyn NativeResolver>> {
        self.resolvers.get(host).cloned().ok_or_else(|| {
            EngineError::Native {
                host: host.to_string(),
                message: "no resolver registered".into(),
            }
        })
    }

    pub fn has(&self, host: &str) -> bool {
        self.resolvers.contains_key(host)
    }
}

pub fn is_native_url(url: &str) -> bool {
    url.strip_prefix(NATIVE_SCHEME)
        .is_some_and(|rest| rest.starts_with("://"))
}

/// Split a `native://host?a=b` URL into host and query arguments.
pub fn parse_native_url(url: &str) -> Result<(String, Vec<(String, String)>)> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| EngineError::InvalidRequest(format!("invalid native URL '{url}': {e}")))?;
    let host = parsed.host_str().unwrap_or_default().to_string();
    if host.is_empty() {
        return Err(EngineError::InvalidRequest(format!(
            "native URL '{url}' has no resolver host"
        )));
    }
    let args = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok((host, args))
}
