// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matching task model (§3, §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionKey;
use crate::ids::TaskQueueName;

/// Task priority. Intermediate values between the named levels are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
    pub const LOW: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(5);
    pub const HIGH: Priority = Priority(10);

    pub fn clamp_to_range(self) -> Self {
        Priority(self.0.min(10))
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

/// The kind of work a task represents, mirrored from the triggering history
/// event (an activity dispatch, a retry, ...). Opaque to Matching itself.
pub type TaskType = String;

/// A unit of dispatchable work in a `(namespace, task_queue)` priority queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub namespace: String,
    pub task_queue: TaskQueueName,
    pub execution_key: ExecutionKey,
    pub node_id: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub scheduled_at: DateTime<Utc>,
    pub visible_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub timeout: std::time::Duration,
}

impl Task {
    /// Deterministic id: `"{namespace}:{workflow_id}:{run_id}:{task_type}:{scheduled_event_id}"`.
    pub fn deterministic_id(
        namespace: &str,
        workflow_id: &str,
        run_id: &str,
        task_type: &str,
        scheduled_event_id: i64,
    ) -> String {
        format!("{namespace}:{workflow_id}:{run_id}:{task_type}:{scheduled_event_id}")
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Recovers the `scheduled_event_id` embedded in [`Self::deterministic_id`]
    /// so a worker reporting back to the engine doesn't need a separate field.
    pub fn scheduled_event_id(&self) -> Option<i64> {
        self.task_id.rsplit(':').next()?.parse().ok()
    }
}

/// Redelivery backoff schedule, capped at 60s (§4.D).
pub const BACKOFF_SCHEDULE_SECS: [u64; 6] = [1, 2, 5, 10, 30, 60];

/// `backoff(attempts)`: attempts are 1-indexed (the count after the failure
/// that triggered the re-enqueue). Anything past the schedule's length stays
/// capped at the last (60s) entry.
pub fn backoff_for_attempt(attempts: u32) -> std::time::Duration {
    let idx = (attempts.saturating_sub(1)) as usize;
    let secs = BACKOFF_SCHEDULE_SECS
        .get(idx)
        .copied()
        .unwrap_or(*BACKOFF_SCHEDULE_SECS.last().unwrap_or(&60));
    std::time::Duration::from_secs(secs)
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
