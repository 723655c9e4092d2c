// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use linkflow_core::test_support::{execution_key, workflow_started_event};
use tempfile::tempdir;

fn sample_record() -> StorageRecord {
    StorageRecord::EventsAppended {
        key: execution_key("acme", "wf-1"),
        events: vec![workflow_started_event(1)],
    }
}

#[test]
fn append_then_flush_then_read_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");

    let mut wal = Wal::open(&path, 0).unwrap();
    let seq = wal.append(&sample_record()).unwrap();
    assert_eq!(seq, 1);
    wal.flush().unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].seq, 1);
}

#[test]
fn reopen_picks_up_max_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&sample_record()).unwrap();
        wal.append(&sample_record()).unwrap();
        wal.flush().unwrap();
    }

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn needs_flush_reflects_threshold() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();
    assert!(!wal.needs_flush());

    for _ in 0..FLUSH_THRESHOLD {
        wal.append(&sample_record()).unwrap();
    }
    assert!(wal.needs_flush());
}

#[test]
fn truncate_before_drops_processed_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();

    wal.append(&sample_record()).unwrap();
    wal.append(&sample_record()).unwrap();
    wal.append(&sample_record()).unwrap();
    wal.flush().unwrap();
    wal.mark_processed(2);

    wal.truncate_before(2).unwrap();
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

#[test]
fn corrupt_wal_is_rotated_to_bak_preserving_valid_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&sample_record()).unwrap();
        wal.flush().unwrap();
    }

    {
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{not valid json\n").unwrap();
    }

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    assert!(path.with_extension("bak").exists());
}
