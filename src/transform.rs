//! Context value transformations
//!
//! Transformations are declared data, not code: each step carries an ordered
//! list of rules and the engine applies them to the context after extraction.
//! Numeric operations fail with a parse error when the current value is not
//! a number; that aborts the step like any other data problem.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::plugin::Context;
use crate::template;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    /// Context key the operation applies to (and writes back to).
    pub key: String,
    #[serde(flatten)]
    pub op: TransformOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Multiply a numeric value.
    Scale { factor: f64 },
    /// Add to a numeric value.
    Offset { amount: f64 },
    /// Round a numeric value to a fixed number of decimals.
    Round { decimals: usize },
    Uppercase,
    Lowercase,
    Trim,
    Replace { from: String, to: String },
    /// Set the key when it is missing or empty.
    Fallback { value: String },
    /// Re-render the key from a template resolved against the context.
    Format { template: String },
}

pub fn apply(rules: &[TransformRule], ctx: &mut Context) -> Result<()> {
    for rule in rules {
        apply_one(rule, ctx)?;
    }
    Ok(())
}

fn apply_one(rule: &TransformRule, ctx: &mut Context) -> Result<()> {
    let current = ctx.get(&rule.key).unwrap_or_default().to_string();

    let next = match &rule.op {
        TransformOp::Scale { factor } => format_number(parse_number(&rule.key, &current)? * factor),
        TransformOp::Offset { amount } => format_number(parse_number(&rule.key, &current)? + amount),
        TransformOp::Round { decimals } => {
            format!("{:.*}", decimals, parse_number(&rule.key, &current)?)
        }
        TransformOp::Uppercase => current.to_uppercase(),
        TransformOp::Lowercase => current.to_lowercase(),
        TransformOp::Trim => current.trim().to_string(),
        TransformOp::Replace { from, to } => current.replace(from.as_str(), to),
        TransformOp::Fallback { value } => {
            if ctx.is_set(&rule.key) {
                return Ok(());
            }
            value.clone()
        }
        TransformOp::Format { template } => template::resolve(template, ctx),
    };

    ctx.set(rule.key.clone(), next);
    Ok(())
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        EngineError::Parse(format!("'{key}' is not numeric: '{value}'"))
    })
}

/// Render without a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
