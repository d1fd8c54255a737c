//! Per-(instance, target) execution context
//!
//! A flat string-to-string map threaded through a target's whole step chain.
//! Rebuilt from scratch on every execution cycle; never shared across
//! targets. The merge precedence rule (target overrides global, declared
//! defaults fill remaining gaps) lives here and nowhere else.

use std::collections::BTreeMap;

use super::models::{InputMap, InputSpec};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: BTreeMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context from global inputs ⊕ target inputs ⊕ defaults.
    pub fn merged(
        global: &InputMap,
        target: &InputMap,
        defaults: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut values = global.clone();
        for (key, value) in target {
            values.insert(key.clone(), value.clone());
        }
        for (key, value) in defaults {
            values.entry(key).or_insert(value);
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// True when the key holds a non-empty value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A copy with each declared input's default substituted wherever the
    /// input is still missing (or empty). Used for label resolution so a
    /// failed chain can still name what it was fetching.
    pub fn with_input_defaults(&self, inputs: &[InputSpec]) -> Context {
        let mut ctx = self.clone();
        for input in inputs {
            if let Some(default) = &input.default {
                if !ctx.is_set(&input.key) {
                    ctx.set(input.key.clone(), default.clone());
                }
            }
        }
        ctx
    }
}

impl FromIterator<(String, String)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
