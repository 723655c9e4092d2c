// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;

fn sample_timer(fire_time: DateTime<Utc>, status: TimerStatus) -> Timer {
    Timer {
        shard_id: 3,
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-1"),
        run_id: RunId::new(),
        timer_id: TimerId::new("t1"),
        fire_time,
        status,
        version: 0,
        created_at: fire_time - Duration::seconds(5),
        fired_at: None,
    }
}

#[test]
fn due_when_pending_and_past_fire_time() {
    let now = Utc::now();
    let timer = sample_timer(now - Duration::seconds(1), TimerStatus::Pending);
    assert!(timer.is_due(now));
}

#[test]
fn not_due_when_fire_time_in_future() {
    let now = Utc::now();
    let timer = sample_timer(now + Duration::seconds(10), TimerStatus::Pending);
    assert!(!timer.is_due(now));
}

#[test]
fn not_due_once_terminal() {
    let now = Utc::now();
    let timer = sample_timer(now - Duration::seconds(1), TimerStatus::Fired);
    assert!(!timer.is_due(now));
    assert!(TimerStatus::Fired.is_terminal());
    assert!(!TimerStatus::Pending.is_terminal());
}
