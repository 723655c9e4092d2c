// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn page_token_roundtrips() {
    let token = PageToken { timestamp: Utc::now(), run_id: RunId::new() };
    let encoded = token.encode();
    assert!(encoded.contains('|'));
    let decoded = PageToken::decode(&encoded).expect("decode");
    assert_eq!(decoded.run_id, token.run_id);
}

#[test]
fn page_token_decode_rejects_garbage() {
    assert!(PageToken::decode("not-a-token").is_none());
    assert!(PageToken::decode("2026-01-01T00:00:00Z").is_none());
}

#[test]
fn is_open_reflects_close_time() {
    let record = VisibilityRecord {
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-1"),
        run_id: RunId::new(),
        workflow_type: "onboarding".into(),
        start_time: Utc::now(),
        close_time: None,
        status: WorkflowStatus::Running,
        history_length: None,
        memo: serde_json::json!({}),
    };
    assert!(record.is_open());
}
