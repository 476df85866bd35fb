//! Placeholder interpolation for endpoint templates
//!
//! Handles `{placeholder}` tokens in resource paths and query parameter
//! values, e.g. `/api/stacks/{org_name}/{project_name}/{stack_name}/updates`.
//! Values come from the request [`Context`](crate::partition::Context).

use crate::error::{Error, Result};
use crate::partition::Context;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching placeholders: {name}
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Render a template string, failing on placeholders missing from the context
///
/// Values are substituted verbatim; use for query values, which the URL
/// builder encodes.
pub fn render(template: &str, ctx: &Context) -> Result<String> {
    substitute(template, ctx, value_to_string)
}

/// Render a URL path template, percent-encoding each substituted value so
/// it stays a single path segment
pub fn render_path(template: &str, ctx: &Context) -> Result<String> {
    substitute(template, ctx, |value| {
        urlencoding::encode(&value_to_string(value)).into_owned()
    })
}

fn substitute(template: &str, ctx: &Context, to_text: impl Fn(&Value) -> String) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = PLACEHOLDER_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match ctx.get(name) {
            Some(value) => to_text(value),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a string contains placeholders
pub fn has_placeholders(s: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(s)
}

/// Extract all placeholder names from a template, in order of appearance
pub fn extract_variables(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Convert a JSON value to a string for substitution
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
