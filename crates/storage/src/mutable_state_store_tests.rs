// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use linkflow_core::test_support::{execution_key, initial_mutable_state};

#[tokio::test]
async fn insert_requires_expected_version_zero() {
    let store = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let key = execution_key("acme", "wf-1");
    store.update(&key, initial_mutable_state(), 0).await.unwrap();

    let state = store.get(&key).await.unwrap();
    assert_eq!(state.db_version, 1);
}

#[tokio::test]
async fn update_increments_db_version_by_exactly_one() {
    let store = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let key = execution_key("acme", "wf-1");
    store.update(&key, initial_mutable_state(), 0).await.unwrap();
    let state = store.get(&key).await.unwrap();

    store.update(&key, state, 1).await.unwrap();
    let state = store.get(&key).await.unwrap();
    assert_eq!(state.db_version, 2);
}

#[tokio::test]
async fn update_with_stale_version_is_rejected() {
    let store = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let key = execution_key("acme", "wf-1");
    store.update(&key, initial_mutable_state(), 0).await.unwrap();

    let err = store.update(&key, initial_mutable_state(), 0).await.unwrap_err();
    assert!(matches!(err, StorageError::OptimisticLock { expected: 0 }));
}

#[tokio::test]
async fn get_on_absent_execution_is_not_found() {
    let store = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let key = execution_key("acme", "nope");
    let err = store.get(&key).await.unwrap_err();
    assert!(matches!(err, StorageError::ExecutionNotFound));
}

#[tokio::test]
async fn list_running_excludes_terminal_runs() {
    let store = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let running_key = execution_key("acme", "running");
    let mut done_state = initial_mutable_state();
    done_state.workflow_status = linkflow_core::WorkflowStatus::Completed;
    let done_key = execution_key("acme", "done");

    store.update(&running_key, initial_mutable_state(), 0).await.unwrap();
    store.update(&done_key, done_state, 0).await.unwrap();

    let running = store.list_running().await.unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].workflow_id, running_key.workflow_id);
}
