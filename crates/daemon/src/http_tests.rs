// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use linkflow_core::{NamespaceId, RunId, TaskQueueName, WorkflowId};
use linkflow_rpc::{
    CancelWorkflowRequest, ExecutionRef, ListExecutionsRequest, RetryExecutionRequest, SendSignalRequest,
    StartWorkflowRequest,
};
use linkflow_workflow::{JoinKind, Node, NodeType, WorkflowDefinition};
use serde_json::json;
use tokio::sync::watch;

use super::*;
use crate::config::Config;

fn single_activity_def() -> WorkflowDefinition {
    WorkflowDefinition {
        nodes: vec![Node {
            id: "send".to_string(),
            node_type: NodeType::Activity { task_queue: TaskQueueName::new("emails"), node_config: json!({}) },
            join: JoinKind::And,
            max_attempts: 1,
        }],
        edges: vec![],
        settings: Default::default(),
    }
}

async fn test_daemon() -> Arc<Daemon> {
    let config = Config { shard_count: 1, ..Config::default() };
    let (_tx, rx) = watch::channel(false);
    Arc::new(crate::shard::build(&config, rx).await.expect("daemon builds"))
}

#[tokio::test]
async fn ping_responds_with_pong() {
    let daemon = test_daemon().await;
    let response = dispatch(&daemon, Request::Ping).await;
    assert!(matches!(response, Response::Pong));
}

#[tokio::test]
async fn start_then_get_execution_round_trips_workflow_type_and_input() {
    let daemon = test_daemon().await;

    let start = dispatch(
        &daemon,
        Request::StartWorkflow(StartWorkflowRequest {
            namespace_id: NamespaceId::new("acme"),
            workflow_id: WorkflowId::new("wf-http"),
            workflow_type: "onboarding".to_string(),
            definition: single_activity_def(),
            input: json!({ "email": "a@example.com" }),
            idempotency_key: None,
        }),
    )
    .await;

    let run_id = match start {
        Response::StartWorkflow(resp) => {
            assert!(resp.started);
            resp.run_id
        }
        other => panic!("expected StartWorkflow response, got {other:?}"),
    };

    let execution = ExecutionRef {
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-http"),
        run_id,
    };

    let info = dispatch(&daemon, Request::GetExecution(execution)).await;
    match info {
        Response::Execution(info) => {
            assert_eq!(info.workflow_type, "onboarding");
            assert_eq!(info.current_input, json!({ "email": "a@example.com" }));
            assert_eq!(info.history_length, 2); // WorkflowStarted + ActivityScheduled
        }
        other => panic!("expected Execution response, got {other:?}"),
    }
}

#[tokio::test]
async fn get_execution_on_unknown_run_maps_to_not_found() {
    let daemon = test_daemon().await;
    let execution = ExecutionRef {
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("missing"),
        run_id: RunId::new(),
    };

    let response = dispatch(&daemon, Request::GetExecution(execution)).await;
    match response {
        Response::Error(err) => assert_eq!(err.kind, CoreErrorKind::NotFound),
        other => panic!("expected Error response, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_and_signal_reach_the_owning_shard() {
    let daemon = test_daemon().await;

    let start = dispatch(
        &daemon,
        Request::StartWorkflow(StartWorkflowRequest {
            namespace_id: NamespaceId::new("acme"),
            workflow_id: WorkflowId::new("wf-cancel"),
            workflow_type: "onboarding".to_string(),
            definition: single_activity_def(),
            input: json!({}),
            idempotency_key: None,
        }),
    )
    .await;
    let run_id = match start {
        Response::StartWorkflow(resp) => resp.run_id,
        other => panic!("expected StartWorkflow response, got {other:?}"),
    };

    let execution =
        ExecutionRef { namespace_id: NamespaceId::new("acme"), workflow_id: WorkflowId::new("wf-cancel"), run_id };

    let signaled = dispatch(
        &daemon,
        Request::SendSignal(SendSignalRequest {
            execution: execution.clone(),
            signal_name: "approve".to_string(),
            data: json!({}),
        }),
    )
    .await;
    assert!(matches!(signaled, Response::SignalSent));

    let canceled = dispatch(
        &daemon,
        Request::CancelWorkflow(CancelWorkflowRequest { execution, reason: "user requested".to_string() }),
    )
    .await;
    assert!(matches!(canceled, Response::Canceled));
}

#[tokio::test]
async fn retry_execution_starts_a_fresh_run_with_a_new_run_id() {
    let daemon = test_daemon().await;

    let start = dispatch(
        &daemon,
        Request::StartWorkflow(StartWorkflowRequest {
            namespace_id: NamespaceId::new("acme"),
            workflow_id: WorkflowId::new("wf-retry"),
            workflow_type: "onboarding".to_string(),
            definition: single_activity_def(),
            input: json!({ "n": 1 }),
            idempotency_key: None,
        }),
    )
    .await;
    let original_run_id = match start {
        Response::StartWorkflow(resp) => resp.run_id,
        other => panic!("expected StartWorkflow response, got {other:?}"),
    };

    let execution = ExecutionRef {
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-retry"),
        run_id: original_run_id.clone(),
    };

    let retried = dispatch(&daemon, Request::RetryExecution(RetryExecutionRequest { execution })).await;
    match retried {
        Response::RetryExecution(resp) => assert_ne!(resp.run_id, original_run_id),
        other => panic!("expected RetryExecution response, got {other:?}"),
    }
}

#[tokio::test]
async fn list_open_executions_surfaces_a_freshly_started_run() {
    let daemon = test_daemon().await;

    dispatch(
        &daemon,
        Request::StartWorkflow(StartWorkflowRequest {
            namespace_id: NamespaceId::new("acme"),
            workflow_id: WorkflowId::new("wf-list"),
            workflow_type: "onboarding".to_string(),
            definition: single_activity_def(),
            input: json!({}),
            idempotency_key: None,
        }),
    )
    .await;

    let listed = dispatch(
        &daemon,
        Request::ListOpenExecutions(ListExecutionsRequest {
            namespace_id: NamespaceId::new("acme"),
            page_size: 10,
            page_token: None,
        }),
    )
    .await;

    match listed {
        Response::Executions(resp) => {
            assert!(resp.executions.iter().any(|e| e.execution.workflow_id == WorkflowId::new("wf-list")));
        }
        other => panic!("expected Executions response, got {other:?}"),
    }
}
