// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use linkflow_core::test_support::execution_key;
use serde_json::json;

use super::*;

struct EchoExecutor;

#[async_trait]
impl NodeExecutor for EchoExecutor {
    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutorError> {
        Ok(ctx.config)
    }
}

struct AlwaysFailsExecutor;

#[async_trait]
impl NodeExecutor for AlwaysFailsExecutor {
    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutorError> {
        Err(ExecutorError::non_retryable("nope"))
    }
}

#[test]
fn node_type_of_reads_the_convention_field() {
    assert_eq!(node_type_of(&json!({"node_type": "http_request"})), Some("http_request"));
    assert_eq!(node_type_of(&json!({})), None);
}

#[test]
fn registry_looks_up_by_node_type_and_reports_missing() {
    let registry = ExecutorRegistry::new();
    registry.register("echo", Arc::new(EchoExecutor));
    assert!(registry.get("echo").is_some());
    assert!(registry.get("missing").is_none());
}

#[tokio::test]
async fn executor_round_trips_config_through_context() {
    let registry = ExecutorRegistry::new();
    registry.register("echo", Arc::new(EchoExecutor));
    registry.register("fail", Arc::new(AlwaysFailsExecutor));

    let executor = registry.get("echo").unwrap();
    let ctx = ExecutionContext {
        execution_key: execution_key("acme", "wf-1"),
        node_id: "a".to_string(),
        node_type: "echo".to_string(),
        config: json!({"greeting": "hi"}),
        upstream_inputs: HashMap::new(),
        credentials: Value::Null,
        attempt: 1,
    };
    let out = executor.execute(ctx).await.unwrap();
    assert_eq!(out, json!({"greeting": "hi"}));

    let failing = registry.get("fail").unwrap();
    let ctx = ExecutionContext {
        execution_key: execution_key("acme", "wf-1"),
        node_id: "a".to_string(),
        node_type: "fail".to_string(),
        config: json!({}),
        upstream_inputs: HashMap::new(),
        credentials: Value::Null,
        attempt: 1,
    };
    let err = failing.execute(ctx).await.unwrap_err();
    assert_eq!(err.kind, CoreErrorKind::NonRetryable);
}

#[tokio::test]
async fn no_credentials_source_resolves_to_null() {
    let source = NoCredentials;
    let value = source.resolve(&execution_key("acme", "wf-1"), "a").await;
    assert_eq!(value, Value::Null);
}
