//! Plugin data model: templates, instances, steps and outputs
//!
//! Templates are immutable definitions owned by the external registry;
//! instances are user configuration read fresh on every execution cycle.
//! The engine never persists either.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::transform::TransformRule;

pub type InputMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
}

/// How the raw response body should be interpreted before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    /// JSON wrapped in one layer of callback parentheses.
    Jsonp,
    Text,
}

/// A declared template input with an optional default value. Whether a
/// value arrives via the instance's global inputs or a target map is decided
/// by the configuration, not declared here; the merge rule in
/// `Context::merged` is the single source of precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
}

/// One extraction rule: pull `path` out of the parsed response into the
/// context under `key`. Paths may themselves contain placeholders
/// (`rates.{{to}}`), enabling dynamic lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRule {
    pub key: String,
    pub path: String,
}

/// One request + extract + transform unit within a template's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub body: String,
    /// Header value templates, resolved against the context per request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Proxy address template; empty means the default (non-proxied) client.
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub extract: Vec<ExtractRule>,
    #[serde(default)]
    pub transform: Vec<TransformRule>,
    /// If non-empty and the context already holds a non-empty value for this
    /// key, the whole step is a no-op.
    #[serde(default)]
    pub skip_if_set: String,
    #[serde(default)]
    pub format: ResponseFormat,
    /// Response cache TTL. Any value <= 0 disables caching entirely, on both
    /// the read and the write path.
    #[serde(default)]
    pub cache_minutes: i64,
    /// Fallback charset for decoding the response body; UTF-8 when unset.
    #[serde(default)]
    pub charset: Option<String>,
}

impl Step {
    /// TTL for the response cache, or `None` when this step never caches.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_minutes > 0).then(|| Duration::from_secs(self.cache_minutes as u64 * 60))
    }
}

/// A named result derived from the context after a successful chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    pub key: String,
    /// Value format template.
    pub value: String,
    /// Optional color-state template.
    #[serde(default)]
    pub color: Option<String>,
    /// Optional unit template.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub short_label: Option<String>,
}

/// Immutable definition of a plugin kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginTemplate {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    /// Default refresh interval; instances may override it.
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,
}

fn default_refresh_minutes() -> u64 {
    10
}

impl PluginTemplate {
    /// Declared defaults, used to fill context gaps and to resolve labels
    /// when an input never made it into the context.
    pub fn input_defaults(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.inputs
            .iter()
            .filter_map(|input| input.default.clone().map(|d| (input.key.clone(), d)))
    }
}

/// A configured usage of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInstance {
    pub id: String,
    pub template_id: String,
    /// Global input values.
    #[serde(default)]
    pub inputs: InputMap,
    /// Zero or more targets, each a map of target-scoped input values.
    #[serde(default)]
    pub targets: Vec<InputMap>,
    /// Custom refresh interval override in minutes.
    #[serde(default)]
    pub refresh_minutes: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PluginInstance {
    /// Output key suffix for the target at `index`: empty when the instance
    /// declares no targets, `.{index}` otherwise.
    pub fn target_suffix(&self, index: usize) -> String {
        if self.targets.is_empty() {
            String::new()
        } else {
            format!(".{index}")
        }
    }

    /// Interval the external scheduler should use for this instance:
    /// the custom override, or the template default.
    pub fn effective_refresh(&self, template: &PluginTemplate) -> Duration {
        let minutes = self
            .refresh_minutes
            .unwrap_or(template.refresh_minutes)
            .max(1);
        Duration::from_secs(minutes * 60)
    }
}
