// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use linkflow_core::{NamespaceId, RunId, WorkflowId};

fn sample_timer(shard_id: u32, fire_time: DateTime<Utc>) -> Timer {
    Timer {
        shard_id,
        namespace_id: NamespaceId::new("acme"),
        workflow_id: WorkflowId::new("wf-1"),
        run_id: RunId::new(),
        timer_id: TimerId::new("timer-1"),
        fire_time,
        status: TimerStatus::Pending,
        version: 0,
        created_at: fire_time,
        fired_at: None,
    }
}

#[tokio::test]
async fn insert_rejects_duplicate_timer_id() {
    let store = InMemoryTimerStore::new();
    let timer = sample_timer(0, Utc::now());
    store.insert(timer.clone()).await.unwrap();
    let err = store.insert(timer).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists(_)));
}

#[tokio::test]
async fn fetch_due_excludes_future_timers() {
    let store = InMemoryTimerStore::new();
    let now = Utc::now();
    store.insert(sample_timer(0, now - chrono::Duration::seconds(5))).await.unwrap();
    store.insert(sample_timer(0, now + chrono::Duration::seconds(60))).await.unwrap();

    let due = store.fetch_due(0, now, 10).await.unwrap();
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn fetch_due_leases_so_concurrent_scan_skips() {
    let store = InMemoryTimerStore::new();
    let now = Utc::now();
    store.insert(sample_timer(0, now - chrono::Duration::seconds(1))).await.unwrap();

    let first = store.fetch_due(0, now, 10).await.unwrap();
    assert_eq!(first.len(), 1);
    let second = store.fetch_due(0, now, 10).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn update_status_with_stale_version_is_rejected() {
    let store = InMemoryTimerStore::new();
    let timer = sample_timer(0, Utc::now());
    let key = ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
    store.insert(timer.clone()).await.unwrap();

    let err = store
        .update_status(&key, &timer.timer_id, TimerStatus::Fired, Some(Utc::now()), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::OptimisticLock { expected: 5 }));
}

#[tokio::test]
async fn update_status_releases_lease() {
    let store = InMemoryTimerStore::new();
    let timer = sample_timer(0, Utc::now() - chrono::Duration::seconds(1));
    let key = ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
    store.insert(timer.clone()).await.unwrap();

    let due = store.fetch_due(0, Utc::now(), 10).await.unwrap();
    assert_eq!(due.len(), 1);

    store.update_status(&key, &timer.timer_id, TimerStatus::Fired, Some(Utc::now()), 0).await.unwrap();

    // Re-inserting a due pending timer and fetching again should not be
    // blocked by the earlier lease on the now-fired timer.
    let other = sample_timer(0, Utc::now() - chrono::Duration::seconds(1));
    store.insert(other).await.unwrap();
    let due_again = store.fetch_due(0, Utc::now(), 10).await.unwrap();
    assert_eq!(due_again.len(), 1);
}

#[tokio::test]
async fn cancel_marks_a_pending_timer_canceled() {
    let store = InMemoryTimerStore::new();
    let timer = sample_timer(0, Utc::now() + chrono::Duration::seconds(60));
    let key = ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
    store.insert(timer.clone()).await.unwrap();

    store.cancel(&key, &timer.timer_id, Utc::now()).await.unwrap();

    let due = store.fetch_due(0, Utc::now() + chrono::Duration::seconds(120), 10).await.unwrap();
    assert!(due.is_empty(), "a canceled timer must never be fetched as due");
}

#[tokio::test]
async fn cancel_is_a_no_op_on_an_already_fired_timer() {
    let store = InMemoryTimerStore::new();
    let timer = sample_timer(0, Utc::now() - chrono::Duration::seconds(1));
    let key = ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
    store.insert(timer.clone()).await.unwrap();
    store.update_status(&key, &timer.timer_id, TimerStatus::Fired, Some(Utc::now()), 0).await.unwrap();

    store.cancel(&key, &timer.timer_id, Utc::now()).await.unwrap();
}

#[tokio::test]
async fn cancel_on_unknown_timer_is_a_no_op() {
    let store = InMemoryTimerStore::new();
    let key = ExecutionKey::new(NamespaceId::new("acme"), WorkflowId::new("wf-missing"), RunId::new());
    store.cancel(&key, &TimerId::new("nope"), Utc::now()).await.unwrap();
}

#[tokio::test]
async fn purge_terminal_before_removes_old_fired_timers() {
    let store = InMemoryTimerStore::new();
    let old_fire_time = Utc::now() - chrono::Duration::days(2);
    let mut timer = sample_timer(0, old_fire_time);
    timer.status = TimerStatus::Fired;
    timer.fired_at = Some(old_fire_time);
    store.insert(timer).await.unwrap();

    let removed = store.purge_terminal_before(0, Utc::now() - chrono::Duration::hours(1)).await.unwrap();
    assert_eq!(removed, 1);
}
