//! Plugin data model and execution context

mod context;
mod models;

pub use context::Context;
pub use models::{
    ExtractRule, HttpMethod, InputMap, InputSpec, OutputSpec, PluginInstance,
    PluginTemplate, ResponseFormat, Step,
};
