//! HTTP client pool with failure recovery
//!
//! One default client serves all non-proxied requests; per-proxy clients are
//! created lazily and cached by resolved proxy address. On a network-class
//! failure the pool is reset: the default client is replaced (the old
//! instance is left alive so in-flight requests on it finish) and the proxy
//! cache is cleared. This lets the engine recover from a system proxy or
//! interface change without a process restart.
//!
//! SECURITY CAVEAT: TLS certificate validation is disabled by default
//! (`accept_invalid_certs = true` in `[http]`). Endpoints here are
//! user-supplied and frequently self-signed or carry stale certificates;
//! operators who only poll well-known hosts should turn validation back on.

use dashmap::DashMap;
use reqwest::{Client, Proxy};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

use crate::config::HttpConfig;
use crate::error::{EngineError, Result};

pub struct ClientPool {
    http: HttpConfig,
    default: RwLock<Client>,
    proxied: DashMap<String, Client>,
    resets: AtomicU64,
}

impl ClientPool {
    pub fn new(http: HttpConfig) -> Result<Self> {
        let default = build_client(&http, None)?;
        Ok(Self {
            http,
            default: RwLock::new(default),
            proxied: DashMap::new(),
            resets: AtomicU64::new(0),
        })
    }

    /// The shared default client. `reqwest::Client` is a cheap handle, so
    /// callers get a clone and never observe a half-constructed client.
    pub fn client(&self) -> Client {
        match self.default.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Client routed through `proxy`, created on first use.
    pub fn for_proxy(&self, proxy: &str) -> Result<Client> {
        if let Some(existing) = self.proxied.get(proxy) {
            return Ok(existing.clone());
        }
        let client = build_client(&self.http, Some(proxy))?;
        self.proxied.insert(proxy.to_string(), client.clone());
        Ok(client)
    }

    /// Replace the default client and drop all proxy clients. Called after a
    /// network-class fetch failure.
    pub fn reset(&self) {
        match build_client(&self.http, None) {
            Ok(fresh) => {
                let mut guard = match self.default.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = fresh;
            }
            Err(err) => {
                // Keep the old client rather than leave the pool empty.
                warn!(error = %err, "failed to rebuild default HTTP client");
            }
        }
        self.proxied.clear();
        let resets = self.resets.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(resets, "HTTP client pool reset after network failure");
    }

    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }

    pub fn proxy_client_count(&self) -> usize {
        self.proxied.len()
    }
}

fn build_client(http: &HttpConfig, proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
        .timeout(Duration::from_millis(http.request_timeout_ms))
        .user_agent(&http.user_agent)
        .redirect(reqwest::redirect::Policy::limited(10));

    if http.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(url) = proxy {
        let proxy = Proxy::all(url)
            .map_err(|e| EngineError::InvalidRequest(format!("invalid proxy '{url}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| EngineError::Network(format!("failed to build HTTP client: {e}")))
}
