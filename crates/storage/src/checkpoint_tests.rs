// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn checkpoint_sync_writes_loadable_snapshot() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("snap.zst");
    let checkpointer = Checkpointer::new(snapshot_path.clone());

    let data = StorageSnapshotData::default();
    let result = checkpointer.checkpoint_sync(5, &data).unwrap();
    assert_eq!(result.seq, 5);
    assert!(result.size_bytes > 0);

    let loaded = load_snapshot(&snapshot_path).unwrap().unwrap();
    assert_eq!(loaded.seq, 5);
}

#[test]
fn checkpoint_start_runs_in_background_and_completes() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("snap.zst");
    let checkpointer = Checkpointer::new(snapshot_path.clone());

    let data = StorageSnapshotData::default();
    let handle = checkpointer.start(7, &data);
    let result = handle.wait().unwrap();
    assert_eq!(result.seq, 7);
    assert!(snapshot_path.exists());
}

#[test]
fn load_snapshot_missing_file_is_none() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("missing.zst");
    let loaded = load_snapshot(&snapshot_path).unwrap();
    assert!(loaded.is_none());
}
