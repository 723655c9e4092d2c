// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use linkflow_core::test_support::{execution_key, initial_mutable_state, workflow_started_event};
use tempfile::tempdir;

#[tokio::test]
async fn append_and_update_survive_reopen_via_wal_replay() {
    let dir = tempdir().unwrap();
    let key = execution_key("acme", "wf-1");

    {
        let store = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
        store.append_events(&key, vec![workflow_started_event(1)], 0).await.unwrap();
        MutableStateStore::update(store.as_ref(), &key, initial_mutable_state(), 0).await.unwrap();
    }

    let reopened = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
    let events = reopened.get_events(&key, 1, 1).await.unwrap();
    assert_eq!(events.len(), 1);

    let state = MutableStateStore::get(reopened.as_ref(), &key).await.unwrap();
    assert_eq!(state.db_version, 1);
}

#[tokio::test]
async fn checkpoint_sync_then_reopen_loads_from_snapshot_not_wal() {
    let dir = tempdir().unwrap();
    let key = execution_key("acme", "wf-1");

    {
        let store = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
        store.append_events(&key, vec![workflow_started_event(1)], 0).await.unwrap();
        store.checkpoint_sync().unwrap();
    }

    let reopened = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
    let events = reopened.get_events(&key, 1, 1).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn rejected_append_is_not_replayed() {
    let dir = tempdir().unwrap();
    let key = execution_key("acme", "wf-1");

    {
        let store = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
        store.append_events(&key, vec![workflow_started_event(1)], 0).await.unwrap();
        let err = store.append_events(&key, vec![workflow_started_event(5)], 99).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionMismatch { .. }));
    }

    let reopened = FileBackedExecutionStore::open(dir.path(), ChecksumMode::Strict).unwrap();
    let count = reopened.get_event_count(&key).await.unwrap();
    assert_eq!(count, 1);
}
