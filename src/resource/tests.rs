//! Tests for resource module

use super::*;
use crate::partition::PartitionScheme;
use test_case::test_case;

// ============================================================================
// Built-in Catalog Tests
// ============================================================================

#[test]
fn test_builtin_catalog_parses() {
    let catalog = Catalog::builtin().unwrap();
    assert_eq!(catalog.len(), 21);
    assert!(catalog.get("stacks").is_some());
    assert!(catalog.get("audit_logs").is_some());
}

#[test]
fn test_builtin_parents_precede_children() {
    let catalog = Catalog::builtin().unwrap();
    let names: Vec<&str> = catalog.resources().iter().map(|r| r.name.as_str()).collect();
    for resource in catalog.resources() {
        if let Some(parent) = &resource.parent {
            let parent_pos = names.iter().position(|n| n == parent).unwrap();
            let child_pos = names.iter().position(|n| *n == resource.name).unwrap();
            assert!(parent_pos < child_pos, "{parent} after {}", resource.name);
        }
    }
}

#[test]
fn test_builtin_audit_logs() {
    let catalog = Catalog::builtin().unwrap();
    let audit = catalog.require("audit_logs").unwrap();

    assert!(audit.enterprise);
    assert!(audit.is_incremental());
    assert_eq!(audit.replication_key.as_deref(), Some("timestamp"));
    assert_eq!(
        audit.pagination,
        PaginationKind::BoundedCursor {
            path: CONTINUATION_TOKEN_PATH.to_string()
        }
    );
    assert_eq!(audit.datetime_fields, vec!["timestamp".to_string()]);
    assert_eq!(audit.flatten, vec![FlattenRule::new("user")]);
}

#[test]
fn test_builtin_defaults() {
    let catalog = Catalog::builtin().unwrap();
    let tokens = catalog.require("organization_access_tokens").unwrap();

    assert_eq!(tokens.pagination, PaginationKind::default());
    assert_eq!(tokens.page_size, Some(DEFAULT_PAGE_SIZE));
    assert_eq!(tokens.partition, PartitionScheme::Organization);

    let policies = catalog.require("organization_oidc_issuers_policies").unwrap();
    assert_eq!(policies.records_path, DEFAULT_RECORDS_PATH);
    assert_eq!(policies.tolerated_statuses, vec![404]);
}

#[test]
fn test_builtin_rum_usage_is_single_request() {
    let catalog = Catalog::builtin().unwrap();
    let usage = catalog.require("daily_rum_usage").unwrap();
    assert_eq!(usage.pagination, PaginationKind::None);
    assert_eq!(usage.page_size, None);
}

#[test]
fn test_builtin_children_and_ancestors() {
    let catalog = Catalog::builtin().unwrap();

    let children: Vec<&str> = catalog
        .children("organization_teams")
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(
        children,
        vec![
            "organization_team_members",
            "organization_team_stacks",
            "organization_team_environments",
            "organization_team_access_tokens",
        ]
    );

    let ancestors: Vec<&str> = catalog
        .ancestors("stack_webhook_deliveries")
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(ancestors, vec!["stack_webhooks", "stacks"]);
    assert!(catalog.ancestors("stacks").is_empty());
}

#[test]
fn test_require_unknown_stream() {
    let catalog = Catalog::builtin().unwrap();
    let err = catalog.require("nope").unwrap_err();
    assert!(err.to_string().contains("nope"));
}

// ============================================================================
// Enterprise Filtering Tests
// ============================================================================

#[test]
fn test_enterprise_disabled_drops_descendants() {
    let catalog = Catalog::builtin().unwrap().with_enterprise(false);

    for name in [
        "organization_members",
        "organization_teams",
        "organization_team_members",
        "organization_team_stacks",
        "organization_team_environments",
        "organization_team_access_tokens",
        "audit_logs",
    ] {
        assert!(catalog.get(name).is_none(), "{name} should be dropped");
    }
    assert_eq!(catalog.len(), 14);
    assert!(catalog.get("stacks").is_some());
}

#[test]
fn test_enterprise_enabled_keeps_everything() {
    let catalog = Catalog::builtin().unwrap().with_enterprise(true);
    assert_eq!(catalog.len(), 21);
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_rejects_duplicate_names() {
    let result = Catalog::new(vec![
        ResourceDefinition::new("a", "/a"),
        ResourceDefinition::new("a", "/b"),
    ]);
    assert!(result.unwrap_err().to_string().contains("duplicate"));
}

#[test]
fn test_rejects_parent_declared_later() {
    let result = Catalog::new(vec![
        ResourceDefinition::new("child", "/c").with_parent("parent"),
        ResourceDefinition::new("parent", "/p"),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_partitioned_child() {
    let result = Catalog::new(vec![
        ResourceDefinition::new("parent", "/p"),
        ResourceDefinition::new("child", "/c")
            .with_parent("parent")
            .by_organization(),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_bounded_cursor_without_replication_key() {
    let result = Catalog::new(vec![ResourceDefinition::new("logs", "/logs")
        .with_pagination(PaginationKind::BoundedCursor {
            path: CONTINUATION_TOKEN_PATH.into(),
        })]);
    assert!(result.unwrap_err().to_string().contains("replication key"));
}

#[test_case("/api/orgs/{org_name}/teams", true ; "org key available")]
#[test_case("/api/orgs/{org_name}/teams/{team_name}", false ; "team key not provided")]
fn test_placeholder_validation(path: &str, ok: bool) {
    let result = Catalog::new(vec![ResourceDefinition::new("r", path).by_organization()]);
    assert_eq!(result.is_ok(), ok);
}

#[test]
fn test_child_placeholders_come_from_parent_mapping() {
    let parent = ResourceDefinition::new("teams", "/api/orgs/{org_name}/teams")
        .by_organization()
        .with_child_key("team_name", "name");
    let child = ResourceDefinition::new("members", "/api/orgs/{org_name}/teams/{team_name}")
        .with_parent("teams");
    assert!(Catalog::new(vec![parent.clone(), child]).is_ok());

    let bad_child = ResourceDefinition::new("members", "/api/orgs/{org_name}/teams/{team_id}")
        .with_parent("teams");
    assert!(Catalog::new(vec![parent, bad_child]).is_err());
}

#[test]
fn test_param_placeholders_validated() {
    let result = Catalog::new(vec![ResourceDefinition::new("stacks", "/api/user/stacks")
        .by_organization()
        .with_param("organization", "{org}")]);
    assert!(result.is_err());
}

#[test]
fn test_from_yaml_rejects_unknown_fields() {
    let yaml = "resources:\n  - name: a\n    path: /a\n    bogus: 1\n";
    assert!(Catalog::from_yaml_str(yaml).is_err());
}

#[test]
fn test_from_yaml_token_pagination_defaults() {
    let yaml = "resources:\n  - name: a\n    path: /a\n    pagination:\n      type: token\n";
    let catalog = Catalog::from_yaml_str(yaml).unwrap();
    assert_eq!(catalog.require("a").unwrap().pagination, PaginationKind::default());
}
