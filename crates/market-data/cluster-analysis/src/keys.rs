//! Cache key composition
//!
//! Identity and state keys are plain `.`-joined tokens. Booleans render as
//! `True`/`False` so keys stay stable across hosts.

use crate::context::RuntimeInfo;
use std::fmt::Display;

/// Render a boolean key token
#[must_use]
pub const fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Join display tokens with `.`
#[must_use]
pub fn join_key(parts: &[&dyn Display]) -> String {
    parts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Identity of a handler instance: `{trade_name}.{is_agent_mode}.{variable_id}`
/// under a runtime, otherwise the bare variable id
#[must_use]
pub fn handler_id(runtime: Option<&RuntimeInfo>, variable_id: &str) -> String {
    match runtime {
        Some(runtime) => join_key(&[
            &runtime.trade_name,
            &format_bool(runtime.is_agent_mode),
            &variable_id,
        ]),
        None => variable_id.to_string(),
    }
}
