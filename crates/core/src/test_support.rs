// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use chrono::Utc;
use serde_json::json;

use crate::event::{HistoryEvent, HistoryEventType};
use crate::execution::ExecutionKey;
use crate::ids::{NamespaceId, RunId, WorkflowId};
use crate::state::MutableState;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::state::WorkflowStatus;
    use proptest::prelude::*;

    pub fn arb_workflow_status() -> impl Strategy<Value = WorkflowStatus> {
        prop_oneof![
            Just(WorkflowStatus::Pending),
            Just(WorkflowStatus::Running),
            Just(WorkflowStatus::Waiting),
            Just(WorkflowStatus::Completed),
            Just(WorkflowStatus::Failed),
            Just(WorkflowStatus::Canceled),
            Just(WorkflowStatus::TimedOut),
        ]
    }

    pub fn arb_priority_value() -> impl Strategy<Value = u8> {
        0u8..=10u8
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// A deterministic execution key for a test namespace/workflow, with a fresh
/// `run_id` each call (mirrors engine-side `run_id` allocation).
pub fn execution_key(namespace: &str, workflow_id: &str) -> ExecutionKey {
    ExecutionKey::new(NamespaceId::new(namespace), WorkflowId::new(workflow_id), RunId::new())
}

pub fn workflow_started_event(event_id: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        HistoryEventType::WorkflowStarted,
        event_id,
        Utc::now(),
        json!({}),
    )
}

pub fn activity_scheduled_event(event_id: i64, node_id: &str) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        HistoryEventType::ActivityScheduled,
        event_id,
        Utc::now(),
        json!({"node_id": node_id}),
    )
}

pub fn activity_completed_event(event_id: i64, node_id: &str, output: serde_json::Value) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        HistoryEventType::ActivityCompleted,
        event_id,
        Utc::now(),
        json!({"node_id": node_id, "output": output}),
    )
}

pub fn initial_mutable_state() -> MutableState {
    MutableState::initial(Utc::now(), json!({}))
}
