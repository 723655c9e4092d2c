// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use linkflow_core::test_support::execution_key;

use super::*;

#[test]
fn execution_ref_round_trips_through_execution_key() {
    let key = execution_key("acme", "wf-1");
    let dto: ExecutionRef = (&key).into();
    let back: ExecutionKey = dto.into();
    assert_eq!(key, back);
}

#[test]
fn start_workflow_request_round_trips_through_json() {
    let request = StartWorkflowRequest {
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-1"),
        workflow_type: "onboarding".to_string(),
        definition: WorkflowDefinition { nodes: vec![], edges: vec![], settings: Default::default() },
        input: serde_json::json!({"customer": "acme"}),
        idempotency_key: Some("idem-1".to_string()),
    };

    let json = serde_json::to_string(&request).expect("serialize");
    let back: StartWorkflowRequest = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.namespace_id, request.namespace_id);
    assert_eq!(back.idempotency_key, request.idempotency_key);
}

#[test]
fn list_executions_response_round_trips_with_no_next_page() {
    let response = ListExecutionsResponse {
        executions: vec![ExecutionSummary {
            execution: ExecutionRef {
                namespace_id: NamespaceId::new("acme"),
                workflow_id: WorkflowId::new("wf-1"),
                run_id: RunId::new(),
            },
            workflow_type: "onboarding".to_string(),
            status: WorkflowStatus::Running,
            start_time: Utc::now(),
            close_time: None,
        }],
        next_page_token: None,
    };

    let json = serde_json::to_string(&response).expect("serialize");
    let back: ListExecutionsResponse = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, response);
}
