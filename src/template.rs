//! Placeholder template resolution
//!
//! Substitutes `{{key}}` tokens using the per-target context. Resolution is
//! a single left-to-right pass: replacement values are never rescanned, so
//! there is no recursive expansion. Keys absent from the context resolve to
//! the empty string.

use crate::plugin::Context;

pub fn resolve(template: &str, ctx: &Context) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                if let Some(value) = ctx.get(key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated token, keep it verbatim
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
