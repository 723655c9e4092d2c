// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History event types (§3): the append-only record of everything that has
//! happened to a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant for a [`HistoryEvent`]. Kept separate from the payload so a
/// reader can filter/route on `event_type` without deserializing `payload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryEventType {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    WorkflowCanceled,
    ActivityScheduled,
    ActivityStarted,
    ActivityCompleted,
    ActivityFailed,
    ActivityTimedOut,
    TimerStarted,
    TimerFired,
    TimerCanceled,
    SignalReceived,
    ContinueAsNew,
}

crate::simple_display! {
    HistoryEventType {
        WorkflowStarted => "WorkflowStarted",
        WorkflowCompleted => "WorkflowCompleted",
        WorkflowFailed => "WorkflowFailed",
        WorkflowCanceled => "WorkflowCanceled",
        ActivityScheduled => "ActivityScheduled",
        ActivityStarted => "ActivityStarted",
        ActivityCompleted => "ActivityCompleted",
        ActivityFailed => "ActivityFailed",
        ActivityTimedOut => "ActivityTimedOut",
        TimerStarted => "TimerStarted",
        TimerFired => "TimerFired",
        TimerCanceled => "TimerCanceled",
        SignalReceived => "SignalReceived",
        ContinueAsNew => "ContinueAsNew",
    }
}

/// A single entry in a run's history.
///
/// `event_id` is strictly increasing per run starting at 1 and contiguous
/// (I1). `version` monotonically increases with each state-mutating decision
/// batch (I2). `payload` is an opaque blob produced by a pluggable
/// serializer (JSON by default); it is never required to read `event_type`
/// or `event_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    pub event_type: HistoryEventType,
    pub version: i64,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl HistoryEvent {
    pub fn new(
        event_id: i64,
        event_type: HistoryEventType,
        version: i64,
        timestamp: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self { event_id, event_type, version, timestamp, payload }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
