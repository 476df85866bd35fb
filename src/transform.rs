//! Record post-processing
//!
//! Applied to every record node in this order:
//! 1. keys are decamelized recursively (`githubLogin` → `github_login`)
//! 2. flatten rules promote nested objects to prefixed fields
//! 3. declared datetime fields go from epoch seconds to RFC 3339
//! 4. context keys missing from the record are injected

use crate::partition::Context;
use crate::resource::{FlattenRule, ResourceDefinition};
use crate::types::{JsonValue, Record};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Convert one camelCase key to snake_case
///
/// Keys that are entirely uppercase (or numeric) are left alone. Acronyms
/// collapse to one word: `userID` → `user_id`, `HTMLParser` → `html_parser`.
pub fn decamelize(key: &str) -> String {
    if !key.chars().any(char::is_lowercase) {
        return key.to_string();
    }

    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// Decamelize every object key in a value, recursing into arrays
pub fn decamelize_keys(value: JsonValue) -> JsonValue {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (decamelize(&k), decamelize_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(decamelize_keys).collect()),
        other => other,
    }
}

/// Promote the keys of `record[rule.field]` to top-level prefixed fields
///
/// Leaves the record untouched when the field is absent or not an object.
pub fn flatten(record: &mut Record, rule: &FlattenRule) {
    if !record.get(&rule.field).is_some_and(Value::is_object) {
        return;
    }
    let Some(Value::Object(nested)) = record.remove(&rule.field) else {
        return;
    };

    let prefix = rule.prefix();
    for (key, value) in nested {
        record.insert(format!("{prefix}{key}"), value);
    }
}

/// Render epoch seconds as RFC 3339 UTC, e.g. `2023-11-14T22:13:20Z`
///
/// Non-numeric values yield `None`.
pub fn epoch_to_rfc3339(value: &JsonValue) -> Option<String> {
    let Value::Number(n) = value else {
        return None;
    };

    if let Some(secs) = n.as_i64() {
        return DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    let secs = n.as_f64()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (whole, nanos) = (secs.floor() as i64, (secs.fract() * 1e9).round() as u32);
    DateTime::<Utc>::from_timestamp(whole, nanos.min(999_999_999))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Add context keys the record does not already carry
pub fn inject_context(record: &mut Record, context: &Context) {
    for (key, value) in context.iter() {
        if !record.contains_key(key) {
            record.insert(key.clone(), value.clone());
        }
    }
}

/// Run the full post-processing pipeline for one record of `resource`
pub fn post_process(resource: &ResourceDefinition, record: Record, context: &Context) -> Record {
    let mut record = match decamelize_keys(Value::Object(record)) {
        Value::Object(map) => map,
        _ => Record::new(),
    };

    for rule in &resource.flatten {
        flatten(&mut record, rule);
    }

    for field in &resource.datetime_fields {
        if let Some(iso) = record.get(field).and_then(epoch_to_rfc3339) {
            record.insert(field.clone(), Value::String(iso));
        }
    }

    inject_context(&mut record, context);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn record(value: JsonValue) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test_case("githubLogin", "github_login")]
    #[test_case("orgName", "org_name")]
    #[test_case("name", "name")]
    #[test_case("already_snake", "already_snake")]
    #[test_case("userID", "user_id")]
    #[test_case("HTMLParser", "html_parser")]
    #[test_case("region1Name", "region1_name")]
    #[test_case("ID", "ID")]
    #[test_case("oidcIssuers", "oidc_issuers")]
    #[test_case("lastUpdate_Time", "last_update_time")]
    fn test_decamelize(input: &str, expected: &str) {
        assert_eq!(decamelize(input), expected);
    }

    #[test]
    fn test_decamelize_keys_recurses() {
        let value = json!({
            "orgName": "acme",
            "requestedBy": {"githubLogin": "jane"},
            "policyPacks": [{"displayName": "p"}],
            "tags": ["keepCase"]
        });
        assert_eq!(
            decamelize_keys(value),
            json!({
                "org_name": "acme",
                "requested_by": {"github_login": "jane"},
                "policy_packs": [{"display_name": "p"}],
                "tags": ["keepCase"]
            })
        );
    }

    #[test]
    fn test_flatten_user() {
        let mut row = record(json!({"user": {"name": "Jane", "github_login": "jane123"}, "role": "admin"}));
        flatten(&mut row, &FlattenRule::new("user"));
        assert_eq!(
            Value::Object(row),
            json!({"user_name": "Jane", "user_github_login": "jane123", "role": "admin"})
        );
    }

    #[test]
    fn test_flatten_custom_prefix_and_missing_field() {
        let mut row = record(json!({"owner": {"id": 7}}));
        flatten(
            &mut row,
            &FlattenRule {
                field: "owner".into(),
                prefix: Some("o_".into()),
            },
        );
        assert_eq!(Value::Object(row.clone()), json!({"o_id": 7}));

        flatten(&mut row, &FlattenRule::new("user"));
        assert_eq!(Value::Object(row), json!({"o_id": 7}));
    }

    #[test]
    fn test_flatten_leaves_non_objects() {
        let mut row = record(json!({"user": null}));
        flatten(&mut row, &FlattenRule::new("user"));
        assert_eq!(Value::Object(row), json!({"user": null}));
    }

    #[test]
    fn test_epoch_to_rfc3339() {
        assert_eq!(
            epoch_to_rfc3339(&json!(1_700_000_000)).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(
            epoch_to_rfc3339(&json!(1_700_000_000.5)).as_deref(),
            Some("2023-11-14T22:13:20.500Z")
        );
        assert_eq!(epoch_to_rfc3339(&json!("2023-11-14T22:13:20Z")), None);
        assert_eq!(epoch_to_rfc3339(&json!(null)), None);
    }

    #[test]
    fn test_inject_context_keeps_record_values() {
        let mut row = record(json!({"org_name": "from-record", "name": "team-a"}));
        let ctx = Context::new()
            .with("org_name", "from-context")
            .with("team_name", "team-a");
        inject_context(&mut row, &ctx);
        assert_eq!(
            Value::Object(row),
            json!({"org_name": "from-record", "name": "team-a", "team_name": "team-a"})
        );
    }

    #[test]
    fn test_post_process_members() {
        let resource = ResourceDefinition::new("organization_members", "/api/orgs/{org_name}/members")
            .with_flatten(FlattenRule::new("user"));
        let raw = record(json!({
            "role": "admin",
            "user": {"name": "Jane", "githubLogin": "jane123", "avatarUrl": "https://a"}
        }));
        let ctx = Context::new().with("org_name", "acme");

        let out = post_process(&resource, raw, &ctx);
        assert_eq!(
            Value::Object(out),
            json!({
                "role": "admin",
                "user_name": "Jane",
                "user_github_login": "jane123",
                "user_avatar_url": "https://a",
                "org_name": "acme"
            })
        );
    }

    #[test]
    fn test_post_process_audit_log() {
        let resource = ResourceDefinition::new("audit_logs", "/api/orgs/{org_name}/auditlogs")
            .with_flatten(FlattenRule::new("user"))
            .with_datetime_field("timestamp");
        let raw = record(json!({
            "timestamp": 1_700_000_000,
            "event": "stack-created",
            "user": {"name": "Jane", "githubLogin": "jane123"}
        }));

        let out = post_process(&resource, raw, &Context::new());
        assert_eq!(out.get("timestamp"), Some(&json!("2023-11-14T22:13:20Z")));
        assert_eq!(out.get("user_github_login"), Some(&json!("jane123")));
        assert!(!out.contains_key("user"));
    }
}
