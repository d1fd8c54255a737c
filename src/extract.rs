//! Response extraction
//!
//! Pulls declared fields out of a raw response body into the context.
//! Supported formats: `json` (dot-separated paths, numeric segments index
//! arrays), `jsonp` (one layer of callback parentheses stripped, then json),
//! and `text` (a path of `$` captures the entire body verbatim).
//!
//! Paths are themselves templates, so `rates.{{to}}` resolves against the
//! current context before the lookup. Rules apply in declaration order and
//! each rule sees the context as mutated by the previous ones.

use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::plugin::{Context, ExtractRule, ResponseFormat};
use crate::template;

/// Capture-everything path for text responses.
const WHOLE_BODY: &str = "$";

pub fn apply(
    format: ResponseFormat,
    body: &str,
    rules: &[ExtractRule],
    ctx: &mut Context,
) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }

    match format {
        ResponseFormat::Text => {
            for rule in rules {
                if rule.path == WHOLE_BODY {
                    ctx.set(rule.key.clone(), body);
                }
                // Other paths are meaningless for text and ignored.
            }
            Ok(())
        }
        ResponseFormat::Jsonp => extract_json(strip_jsonp(body), rules, ctx),
        ResponseFormat::Json => extract_json(body, rules, ctx),
    }
}

fn extract_json(body: &str, rules: &[ExtractRule], ctx: &mut Context) -> Result<()> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| EngineError::Parse(format!("malformed JSON response: {e}")))?;

    for rule in rules {
        let path = template::resolve(&rule.path, ctx);
        let value = lookup(&root, &path).ok_or_else(|| {
            EngineError::Parse(format!("path '{path}' not found in response"))
        })?;
        let rendered = render(value);
        debug!(key = %rule.key, path = %path, "extracted field");
        ctx.set(rule.key.clone(), rendered);
    }
    Ok(())
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Strip one layer of JSONP callback wrapping: `cb({...});` becomes `{...}`.
/// Bodies without parentheses pass through untouched.
fn strip_jsonp(body: &str) -> &str {
    let trimmed = body.trim().trim_end_matches(';').trim_end();
    if let (Some(open), Some(close)) = (trimmed.find('('), trimmed.rfind(')')) {
        if open < close {
            return &trimmed[open + 1..close];
        }
    }
    trimmed
}
