//! Output resolution and publication
//!
//! After a successful chain every declared output is resolved against the
//! final context and published under the sink key convention (see the sink
//! module). Writes are suppressed when the sink already holds the same
//! value, so an unchanged reading does not invalidate downstream consumers.
//!
//! On failure the outputs still get written, with the error sentinel as the
//! value and labels resolved from whatever the context holds plus declared
//! input defaults, so the UI can name the broken data source instead of
//! going blank.

use tracing::debug;

use super::Engine;
use crate::plugin::{Context, OutputSpec, PluginInstance, PluginTemplate};
use crate::sink::{
    COLOR_SUFFIX, LABEL_PREFIX, SHORT_SUFFIX, UNIT_SUFFIX, VALUE_EMPTY, VALUE_ERROR, ValueSink,
};
use crate::template;

pub(crate) fn write_outputs(
    engine: &Engine,
    instance: &PluginInstance,
    template: &PluginTemplate,
    ctx: &Context,
    target_suffix: &str,
) {
    let label_ctx = ctx.with_input_defaults(&template.inputs);

    for output in &template.outputs {
        let key = value_key(instance, target_suffix, output);

        let mut value = template::resolve(&output.value, ctx);
        if value.is_empty() {
            value = VALUE_EMPTY.to_string();
        }
        inject_if_changed(engine.sink.as_ref(), &key, &value);

        if let Some(color) = &output.color {
            inject_if_changed(
                engine.sink.as_ref(),
                &format!("{key}{COLOR_SUFFIX}"),
                &template::resolve(color, ctx),
            );
        }
        if let Some(unit) = &output.unit {
            inject_if_changed(
                engine.sink.as_ref(),
                &format!("{key}{UNIT_SUFFIX}"),
                &template::resolve(unit, ctx),
            );
        }

        write_labels(engine.sink.as_ref(), &key, output, &label_ctx);
    }
}

/// Error-path publication: the sentinel as every output's value, labels
/// still resolved so the display names what failed. Inputs that never made
/// it into the context fall back to their declared defaults; a label
/// placeholder with no value at all resolves empty rather than leaking a
/// raw internal key.
pub(crate) fn write_error_outputs(
    engine: &Engine,
    instance: &PluginInstance,
    template: &PluginTemplate,
    ctx: &Context,
    target_suffix: &str,
) {
    let label_ctx = ctx.with_input_defaults(&template.inputs);

    for output in &template.outputs {
        let key = value_key(instance, target_suffix, output);
        inject_if_changed(engine.sink.as_ref(), &key, VALUE_ERROR);
        write_labels(engine.sink.as_ref(), &key, output, &label_ctx);
    }
    debug!(instance = %instance.id, suffix = target_suffix, "published error sentinels");
}

fn value_key(instance: &PluginInstance, target_suffix: &str, output: &OutputSpec) -> String {
    format!("{}{}.{}", instance.id, target_suffix, output.key)
}

fn write_labels(sink: &dyn ValueSink, value_key: &str, output: &OutputSpec, label_ctx: &Context) {
    if let Some(label) = &output.label {
        inject_if_changed(
            sink,
            &format!("{LABEL_PREFIX}{value_key}"),
            &template::resolve(label, label_ctx),
        );
    }
    if let Some(short) = &output.short_label {
        inject_if_changed(
            sink,
            &format!("{LABEL_PREFIX}{value_key}{SHORT_SUFFIX}"),
            &template::resolve(short, label_ctx),
        );
    }
}

fn inject_if_changed(sink: &dyn ValueSink, key: &str, value: &str) {
    if sink.get_value(key).as_deref() == Some(value) {
        return;
    }
    sink.inject_value(key, value);
}
