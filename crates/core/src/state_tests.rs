// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn initial_state_has_next_event_id_two() {
    let state = MutableState::initial(Utc::now(), json!({}));
    assert_eq!(state.next_event_id, 2);
    assert_eq!(state.db_version, 0);
    assert_eq!(state.workflow_status, WorkflowStatus::Running);
    assert!(state.pending_activities.is_empty());
    assert!(state.pending_timers.is_empty());
}

#[test]
fn terminal_statuses_are_absorbing() {
    for status in [
        WorkflowStatus::Completed,
        WorkflowStatus::Failed,
        WorkflowStatus::Canceled,
        WorkflowStatus::TimedOut,
    ] {
        assert!(status.is_terminal());
    }
    assert!(!WorkflowStatus::Running.is_terminal());
    assert!(!WorkflowStatus::Waiting.is_terminal());
    assert!(!WorkflowStatus::Pending.is_terminal());
}

#[test]
fn empty_collections_roundtrip_through_json() {
    let state = MutableState::initial(Utc::now(), json!(null));
    let bytes = serde_json::to_vec(&state).expect("serialize");
    let back: MutableState = serde_json::from_slice(&bytes).expect("deserialize");
    assert!(back.pending_activities.is_empty());
    assert!(back.completed_nodes.is_empty());
    assert!(back.buffered_events.is_empty());
}
