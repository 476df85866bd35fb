//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → Tap → HTTP requests → RECORD/STATE messages

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tap_pulumi_cloud::engine::Message;
use tap_pulumi_cloud::http::{HttpClient, HttpClientConfig};
use tap_pulumi_cloud::state::{BookmarkStore, StateManager};
use tap_pulumi_cloud::{Error, Tap, TapConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> TapConfig {
    TapConfig::from_json_str(&format!(
        r#"{{
            "token": "pul-test",
            "organizations": ["acme"],
            "api_url": "{}",
            "max_retries": 1,
            "requests_per_second": 1000
        }}"#,
        server.uri()
    ))
    .unwrap()
}

fn records(messages: &[Message], stream: &str) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { stream: s, record } if s == stream => Some(Value::Object(record.clone())),
            _ => None,
        })
        .collect()
}

async fn mount_stacks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/user/stacks"))
        .and(query_param("organization", "acme"))
        .and(query_param("pageSize", "100"))
        .and(header("Authorization", "token pul-test"))
        .and(header("Accept", "application/vnd.pulumi+8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stacks": [
                {"orgName": "acme", "projectName": "web", "stackName": "dev", "lastUpdate": 1700000000},
                {"orgName": "acme", "projectName": "web", "stackName": "prod", "lastUpdate": 1700000500}
            ]
        })))
        .mount(server)
        .await;
}

// ============================================================================
// End-to-end Sync Tests
// ============================================================================

#[tokio::test]
async fn test_sync_stacks_and_tolerated_children() {
    let server = MockServer::start().await;
    mount_stacks(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/stacks/acme/web/dev/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "notify", "displayName": "Notify", "payloadUrl": "https://example.com/hook", "active": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/stacks/acme/web/prod/hooks"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::in_memory();
    let tap = Tap::new(&config_for(&server), Arc::new(state)).unwrap();
    let plan = tap
        .plan(Some(&["stacks".to_string(), "stack_webhooks".to_string()]))
        .unwrap();

    let mut messages: Vec<Message> = Vec::new();
    let stats = tap.sync(&plan, &mut messages).await.unwrap();

    let stacks = records(&messages, "stacks");
    assert_eq!(stacks.len(), 2);
    assert_eq!(stacks[0]["stack_name"], json!("dev"));
    assert_eq!(stacks[0]["project_name"], json!("web"));

    let hooks = records(&messages, "stack_webhooks");
    assert_eq!(
        hooks,
        vec![json!({
            "name": "notify",
            "display_name": "Notify",
            "payload_url": "https://example.com/hook",
            "active": true,
            "org_name": "acme",
            "project_name": "web",
            "stack_name": "dev"
        })]
    );

    // Each stack record is followed by its webhooks
    let order: Vec<&str> = messages.iter().filter_map(Message::stream).collect();
    assert_eq!(order, vec!["stacks", "stack_webhooks", "stacks"]);

    assert!(messages.last().unwrap().is_state());
    assert_eq!(stats.records_synced, 3);
    assert_eq!(stats.partitions_synced, 3);
}

#[tokio::test]
async fn test_sync_child_only_selection_skips_parent_records() {
    let server = MockServer::start().await;
    mount_stacks(&server).await;

    Mock::given(method("GET"))
        .and(path_regex_hooks())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let state = StateManager::in_memory();
    let tap = Tap::new(&config_for(&server), Arc::new(state)).unwrap();
    let plan = tap.plan(Some(&["stack_webhooks".to_string()])).unwrap();

    let mut messages: Vec<Message> = Vec::new();
    tap.sync(&plan, &mut messages).await.unwrap();

    assert!(records(&messages, "stacks").is_empty());
    assert_eq!(messages.len(), 1);
}

fn path_regex_hooks() -> wiremock::matchers::PathRegexMatcher {
    wiremock::matchers::path_regex(r"^/api/stacks/acme/web/[a-z]+/hooks$")
}

#[tokio::test]
async fn test_sync_reports_failed_resources_after_running_others() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/stacks"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orgs/acme/agent-pools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "agentPools": [{"id": "pool-1", "name": "default", "agentCount": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::in_memory();
    let tap = Tap::new(&config_for(&server), Arc::new(state)).unwrap();
    let plan = tap
        .plan(Some(&[
            "stacks".to_string(),
            "organization_agent_pools".to_string(),
        ]))
        .unwrap();

    let mut messages: Vec<Message> = Vec::new();
    let err = tap.sync(&plan, &mut messages).await.unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, Error::SyncFailed { .. }));
    assert!(message.contains("403 Client Error: Forbidden"));
    assert!(message.contains("/api/user/stacks"));

    let pools = records(&messages, "organization_agent_pools");
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0]["agent_count"], json!(2));
}

#[tokio::test]
async fn test_child_failure_keeps_sibling_streams_and_later_parents() {
    let server = MockServer::start().await;
    mount_stacks(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/stacks/acme/web/dev/hooks"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/stacks/acme/web/prod/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "notify", "payloadUrl": "https://example.com/hook"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    for stack in ["dev", "prod"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/stacks/acme/web/{stack}/updates")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updates": [{"version": 1, "result": "succeeded"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let state = StateManager::in_memory();
    let tap = Tap::new(&config_for(&server), Arc::new(state)).unwrap();
    let plan = tap
        .plan(Some(&[
            "stacks".to_string(),
            "stack_updates".to_string(),
            "stack_webhooks".to_string(),
        ]))
        .unwrap();

    let mut messages: Vec<Message> = Vec::new();
    let err = tap.sync(&plan, &mut messages).await.unwrap_err();

    assert_eq!(records(&messages, "stacks").len(), 2);
    assert_eq!(records(&messages, "stack_updates").len(), 2);
    assert_eq!(records(&messages, "stack_webhooks").len(), 1);
    assert!(messages.last().unwrap().is_state());

    let Error::SyncFailed { streams } = err else {
        panic!("expected SyncFailed, got {err:?}");
    };
    assert_eq!(streams.len(), 1);
    assert!(streams[0].starts_with("stack_webhooks [org_name=acme/project_name=web/stack_name=dev]: 403"));
}

#[tokio::test]
async fn test_audit_logs_resume_from_state_file() {
    let server = MockServer::start().await;
    let signpost = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orgs/acme/auditlogs"))
        .and(query_param("startTime", "1717000000"))
        .and(query_param("endTime", "1717200000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auditLogEvents": [
                {"timestamp": 1717100000, "event": "stack-deleted", "description": "web/old",
                 "user": {"name": "Jane", "githubLogin": "jane123"}},
                {"timestamp": 1717000000, "event": "stack-created", "description": "web/dev",
                 "user": {"name": "Jane", "githubLogin": "jane123"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    std::fs::write(
        &state_path,
        r#"{"bookmarks": {"audit_logs": {"partitions": [
            {"context": {"org_name": "acme"}, "replication_key": "timestamp",
             "replication_key_value": "2024-05-29T16:26:40Z"}
        ]}}}"#,
    )
    .unwrap();

    let mut config = config_for(&server);
    config.enterprise_streams = true;
    let state = StateManager::from_file(&state_path).unwrap();
    let client = HttpClient::with_config(
        HttpClientConfig::builder().token("pul-test").no_rate_limit().build(),
    )
    .unwrap();
    let tap = Tap::with_parts(
        &config,
        Arc::new(client),
        Arc::new(state.clone()),
        config.engine_config().with_signpost(signpost),
    )
    .unwrap();
    let plan = tap.plan(Some(&["audit_logs".to_string()])).unwrap();

    let mut messages: Vec<Message> = Vec::new();
    tap.sync(&plan, &mut messages).await.unwrap();

    let logs = records(&messages, "audit_logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["timestamp"], json!("2024-05-30T20:13:20Z"));
    assert_eq!(logs[0]["user_name"], json!("Jane"));
    assert_eq!(logs[0]["user_github_login"], json!("jane123"));

    let context = tap_pulumi_cloud::partition::Context::new().with("org_name", "acme");
    assert_eq!(
        state.get_bookmark("audit_logs", &context).await.map(|b| b.value),
        Some(json!("2024-05-30T20:13:20Z"))
    );

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(
        written["bookmarks"]["audit_logs"]["partitions"][0]["replication_key_value"],
        json!("2024-05-30T20:13:20Z")
    );
}
