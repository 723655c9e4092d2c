// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable timer model (§3, §4.C).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NamespaceId, RunId, TimerId, WorkflowId};

/// `Pending → Fired | Canceled`. Transitions are terminal (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerStatus {
    Pending,
    Fired,
    Canceled,
}

crate::simple_display! {
    TimerStatus {
        Pending => "pending",
        Fired => "fired",
        Canceled => "canceled",
    }
}

impl TimerStatus {
    /// Transitions out of `Pending` are terminal; everything else is a no-op target.
    pub fn is_terminal(self) -> bool {
        matches!(self, TimerStatus::Fired | TimerStatus::Canceled)
    }
}

/// A shard-scoped durable timer (§3).
///
/// `timer_id` is unique within a run; a second `TimerStarted` for the same id
/// fails with `AlreadyExists`. `fire_time` must be `>= created_at`. Updates
/// use `UPDATE ... WHERE version = expected`, failing with
/// `OptimisticLockConflict` on mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    pub shard_id: u32,
    pub namespace_id: NamespaceId,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub timer_id: TimerId,
    pub fire_time: DateTime<Utc>,
    pub status: TimerStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub fired_at: Option<DateTime<Utc>>,
}

impl Timer {
    /// A timer with `status = Pending` and `fire_time <= now` is "due" (I4).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TimerStatus::Pending && self.fire_time <= now
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
