//! Tests for partition module

use super::*;
use crate::resource::ResourceDefinition;
use crate::types::Record;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ============================================================================
// Context Tests
// ============================================================================

#[test]
fn test_context_empty_id() {
    let ctx = Context::new();
    assert!(ctx.is_empty());
    assert_eq!(ctx.id(), "default");
}

#[test]
fn test_context_id_is_sorted() {
    let ctx = Context::new().with("team_name", "core").with("org_name", "acme");
    assert_eq!(ctx.len(), 2);
    assert_eq!(ctx.id(), "org_name=acme/team_name=core");
}

#[test]
fn test_context_get_str() {
    let ctx = Context::new().with("org_name", "acme").with("num_stacks", 3);
    assert_eq!(ctx.get_str("org_name"), Some("acme"));
    assert_eq!(ctx.get_str("num_stacks"), None);
    assert_eq!(ctx.get("num_stacks"), Some(&json!(3)));
}

#[test]
fn test_context_serializes_as_plain_object() {
    let ctx = Context::new().with("org_name", "acme");
    let value = serde_json::to_value(&ctx).unwrap();
    assert_eq!(value, json!({"org_name": "acme"}));

    let back: Context = serde_json::from_value(value).unwrap();
    assert_eq!(back, ctx);
}

#[test]
fn test_context_from_iter() {
    let ctx: Context = [("a", "1"), ("b", "2")].into_iter().collect();
    assert_eq!(ctx.get_str("b"), Some("2"));
}

// ============================================================================
// ContextResolver Tests
// ============================================================================

#[test]
fn test_partitions_per_organization() {
    let resolver = ContextResolver::new(vec!["acme".into(), "globex".into()]);
    let stacks = ResourceDefinition::new("stacks", "/api/user/stacks").by_organization();

    let contexts = resolver.partitions(&stacks).unwrap();
    assert_eq!(
        contexts,
        vec![
            Context::new().with(ORG_NAME_KEY, "acme"),
            Context::new().with(ORG_NAME_KEY, "globex"),
        ]
    );
}

#[test]
fn test_partitions_without_scheme() {
    let resolver = ContextResolver::new(vec!["acme".into()]);
    let resource = ResourceDefinition::new("things", "/api/things");

    let contexts = resolver.partitions(&resource).unwrap();
    assert_eq!(contexts, vec![Context::new()]);
}

#[test]
fn test_partitions_no_organizations() {
    let resolver = ContextResolver::default();
    let stacks = ResourceDefinition::new("stacks", "/api/user/stacks").by_organization();
    assert!(resolver.partitions(&stacks).unwrap().is_empty());
}

#[test]
fn test_partitions_rejects_child() {
    let resolver = ContextResolver::new(vec!["acme".into()]);
    let child = ResourceDefinition::new("stack_updates", "/api/stacks/x/updates").with_parent("stacks");

    let err = resolver.partitions(&child).unwrap_err();
    assert!(err.to_string().contains("stack_updates"));
}

// ============================================================================
// child_context Tests
// ============================================================================

#[test]
fn test_child_context_from_team_record() {
    let teams = ResourceDefinition::new("organization_teams", "/api/orgs/{org_name}/teams")
        .by_organization()
        .with_child_key("org_name", "org_name")
        .with_child_key("team_name", "name");
    let parent_ctx = Context::new().with(ORG_NAME_KEY, "acme");
    let team = record(json!({"name": "team-a", "org_name": "acme", "kind": "pulumi"}));

    let ctx = child_context(&teams, &parent_ctx, &team, &teams.child_context).unwrap();
    assert_eq!(
        ctx,
        Context::new().with("org_name", "acme").with("team_name", "team-a")
    );
}

#[test]
fn test_child_context_accumulates_across_levels() {
    let stacks = ResourceDefinition::new("stacks", "/api/user/stacks");
    let hooks = ResourceDefinition::new("stack_webhooks", "/hooks");

    let org_ctx = Context::new().with(ORG_NAME_KEY, "acme");
    let stack = record(json!({"project_name": "web", "stack_name": "prod"}));
    let stack_ctx = child_context(
        &stacks,
        &org_ctx,
        &stack,
        &mapping(&[("project_name", "project_name"), ("stack_name", "stack_name")]),
    )
    .unwrap();

    let hook = record(json!({"name": "notify"}));
    let hook_ctx =
        child_context(&hooks, &stack_ctx, &hook, &mapping(&[("webhook_name", "name")])).unwrap();

    assert_eq!(hook_ctx.id(), "org_name=acme/project_name=web/stack_name=prod/webhook_name=notify");
}

#[test]
fn test_child_context_keeps_non_string_values() {
    let groups = ResourceDefinition::new("policy_groups_list", "/x");
    let group = record(json!({"name": "default", "num_stacks": 4}));

    let ctx = child_context(
        &groups,
        &Context::new(),
        &group,
        &mapping(&[("policy_group_name", "name"), ("num_stacks", "num_stacks")]),
    )
    .unwrap();
    assert_eq!(ctx.get("num_stacks"), Some(&json!(4)));
}

#[test]
fn test_child_context_missing_field() {
    let teams = ResourceDefinition::new("organization_teams", "/x");
    let team = record(json!({"org_name": "acme"}));

    let err = child_context(
        &teams,
        &Context::new(),
        &team,
        &mapping(&[("team_name", "name")]),
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("organization_teams"));
    assert!(message.contains("'name'"));
}

#[test]
fn test_child_context_null_field_is_missing() {
    let teams = ResourceDefinition::new("organization_teams", "/x");
    let team = record(json!({"name": null}));

    assert!(child_context(&teams, &Context::new(), &team, &mapping(&[("team_name", "name")])).is_err());
}
