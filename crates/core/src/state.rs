// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutable per-execution state snapshot (§3, §4.B).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TimerId;

/// `Pending → Running → (Completed | Failed | Canceled | TimedOut)`.
/// Terminal states are absorbing (I5). `Waiting` is a sub-state of `Running`
/// used for external-signal pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Pending,
    Running,
    Waiting,
    Completed,
    Failed,
    Canceled,
    TimedOut,
}

crate::simple_display! {
    WorkflowStatus {
        Pending => "pending",
        Running => "running",
        Waiting => "waiting",
        Completed => "completed",
        Failed => "failed",
        Canceled => "canceled",
        TimedOut => "timed_out",
    }
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed
                | WorkflowStatus::Failed
                | WorkflowStatus::Canceled
                | WorkflowStatus::TimedOut
        )
    }
}

/// Tracks an in-flight activity (node execution) scheduled into Matching,
/// keyed in [`MutableState::pending_activities`] by `scheduled_event_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub node_id: String,
    pub task_type: String,
    pub scheduled_event_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
}

/// Tracks an in-flight timer, keyed in [`MutableState::pending_timers`] by
/// [`TimerId`] as a string (serde map keys must be strings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerInfo {
    pub timer_id: TimerId,
    pub fire_time: DateTime<Utc>,
    /// The node blocked on this timer (a `Delay` or `Wait` node).
    pub blocked_node_id: String,
}

/// The terminal output of one completed DAG node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,
    pub output: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// The authoritative, versioned snapshot for one execution.
///
/// Round-trips including empty-map normalization: a store must never return
/// `None`/absent collections where the model expects an empty container
/// (§4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutableState {
    pub next_event_id: i64,
    pub db_version: i64,
    pub workflow_status: WorkflowStatus,
    /// Keyed by the scheduling event's `event_id`.
    pub pending_activities: HashMap<i64, ActivityInfo>,
    /// Keyed by `TimerId` as a string.
    pub pending_timers: HashMap<String, TimerInfo>,
    pub completed_nodes: HashMap<String, NodeResult>,
    pub buffered_events: Vec<crate::event::HistoryEvent>,
    pub current_input: serde_json::Value,
    pub execution_start_time: DateTime<Utc>,
    pub failed_node_id: Option<String>,
    /// Integrity checksum of the serialized state, computed by the store.
    /// Preserved here so the store can detect silent blob corruption; whether
    /// a mismatch fails hard or logs-and-continues is a store-level policy.
    pub checksum: Option<String>,
}

impl MutableState {
    /// The initial snapshot written by `StartWorkflow` (§4.F.1): `next_event_id
    /// = 2` because `WorkflowStarted` consumes event_id 1, `db_version = 0`.
    pub fn initial(execution_start_time: DateTime<Utc>, input: serde_json::Value) -> Self {
        Self {
            next_event_id: 2,
            db_version: 0,
            workflow_status: WorkflowStatus::Running,
            pending_activities: HashMap::new(),
            pending_timers: HashMap::new(),
            completed_nodes: HashMap::new(),
            buffered_events: Vec::new(),
            current_input: input,
            execution_start_time,
            failed_node_id: None,
            checksum: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.workflow_status.is_terminal()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
