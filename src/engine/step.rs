//! Single chain-step execution
//!
//! Skip check → template resolution → fingerprint → cache/coalesce → fetch
//! (HTTP or native dispatch) → extraction → transforms → cache write-back.
//! The raw body is only cached after extraction and transforms succeed, so
//! unparseable error pages never poison the cache.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Engine, fingerprint};
use crate::error::Result;
use crate::plugin::{Context, PluginInstance, Step};
use crate::{extract, fetch, native, template, transform};

impl Engine {
    pub(crate) async fn execute_step(
        &self,
        instance: &PluginInstance,
        step: &Step,
        ctx: &mut Context,
        target_suffix: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(crate::error::EngineError::Cancelled);
        }

        if !step.skip_if_set.is_empty() && ctx.is_set(&step.skip_if_set) {
            debug!(step = %step.id, key = %step.skip_if_set, "skip guard satisfied, step is a no-op");
            return Ok(());
        }

        let url = template::resolve(&step.url, ctx);
        let body = template::resolve(&step.body, ctx);
        let key = fingerprint(&instance.id, target_suffix, &step.id, &url, &body);
        let ttl = step.cache_ttl();

        if let Some(ttl) = ttl {
            if let Some(cached) = self.cache.get_fresh(&key, ttl) {
                self.metrics.cache_hit();
                debug!(step = %step.id, "serving response from cache");
                extract::apply(step.format, &cached, &step.extract, ctx)?;
                transform::apply(&step.transform, ctx)?;
                return Ok(());
            }
        }

        let raw = match self.fetch_step(step, &url, &body, &key, ctx, cancel).await {
            Ok(raw) => raw,
            Err(err) => {
                if err.is_network_class() {
                    self.pool.reset();
                    self.metrics.pool_reset();
                }
                return Err(err);
            }
        };

        extract::apply(step.format, &raw, &step.extract, ctx)?;
        transform::apply(&step.transform, ctx)?;

        if ttl.is_some() {
            let max_bytes = self.config.cache.max_body_bytes.as_u64() as usize;
            if raw.len() <= max_bytes {
                self.cache.insert(&key, raw);
            } else {
                warn!(
                    step = %step.id,
                    size = raw.len(),
                    max = max_bytes,
                    "response too large to cache"
                );
            }
        }

        Ok(())
    }

    /// Raw body for one resolved request: native dispatch for the reserved
    /// scheme, otherwise a (possibly proxied) HTTP call through the
    /// coalescing layer.
    async fn fetch_step(
        &self,
        step: &Step,
        url: &str,
        body: &str,
        key: &str,
        ctx: &Context,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if native::is_native_url(url) {
            let (host, args) = native::parse_native_url(url)?;
            let resolver = self.natives.get(&host)?;
            return tokio::select! {
                _ = cancel.cancelled() => Err(crate::error::EngineError::Cancelled),
                result = resolver.resolve(&host, &args) => result,
            };
        }

        let proxy = template::resolve(&step.proxy, ctx);
        let client = if proxy.is_empty() {
            self.pool.client()
        } else {
            self.pool.for_proxy(&proxy)?
        };

        let headers: Vec<(String, String)> = step
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), template::resolve(value, ctx)))
            .collect();

        if self.inflight.is_pending(key) {
            self.metrics.coalesced_join();
        }

        let method = step.method;
        let charset = step.charset.clone();
        let url = url.to_string();
        let body = body.to_string();
        let metrics = Arc::clone(&self.metrics);

        self.inflight
            .fetch_or_join(key, cancel, async move {
                metrics.network_call();
                fetch::fetch(&client, method, &url, &body, &headers, charset.as_deref()).await
            })
            .await
    }
}
