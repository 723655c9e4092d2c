// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed [`EventStore`] + [`MutableStateStore`] with WAL durability
//! and background checkpointing, for single-node / test deployments that
//! want crash recovery without a database (§9 open question).
//!
//! Writes are journaled to the WAL before being applied to the in-memory
//! stores. A background checkpoint periodically snapshots the in-memory
//! state and, once durable, lets the WAL be truncated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, HistoryEvent, MutableState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{load_snapshot, CheckpointError, Checkpointer};
use crate::error::{StorageError, StorageResult};
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::mutable_state_store::{ChecksumMode, InMemoryMutableStateStore, MutableStateStore};
use crate::wal::{Wal, WalError};
use crate::durable_record::StorageRecord;

impl From<WalError> for StorageError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Io(io) => StorageError::Io(io),
            WalError::Json(j) => StorageError::Serde(j),
        }
    }
}

impl From<CheckpointError> for StorageError {
    fn from(e: CheckpointError) -> Self {
        StorageError::Io(std::io::Error::other(e.to_string()))
    }
}

/// The complete materialized state captured by a checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshotData {
    pub events: HashMap<String, Vec<HistoryEvent>>,
    pub states: HashMap<String, (ExecutionKey, MutableState)>,
}

/// Combines the in-memory stores with a WAL and background checkpointer so
/// both survive a process restart.
pub struct FileBackedExecutionStore {
    events: Arc<InMemoryEventStore>,
    states: Arc<InMemoryMutableStateStore>,
    wal: Mutex<Wal>,
    checkpointer: Checkpointer,
}

impl FileBackedExecutionStore {
    /// Open (or create) a durable store rooted at `dir`, replaying any WAL
    /// entries written after the last durable snapshot.
    pub fn open(dir: &Path, checksum_mode: ChecksumMode) -> StorageResult<Arc<Self>> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join("snapshot.zst");
        let wal_path = dir.join("wal.jsonl");

        let loaded = load_snapshot(&snapshot_path).map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))?;
        let (snapshot_seq, snapshot_data) = match loaded {
            Some(snap) => (snap.seq, snap.state),
            None => (0, StorageSnapshotData::default()),
        };

        let events = InMemoryEventStore::new();
        events.restore(snapshot_data.events);
        let states = InMemoryMutableStateStore::new(checksum_mode);
        states.restore(snapshot_data.states);

        let wal = Wal::open(&wal_path, snapshot_seq)?;
        for entry in wal.entries_after(snapshot_seq)? {
            match entry.record {
                StorageRecord::EventsAppended { key, events: new_events } => {
                    events.apply_append(&key, new_events);
                }
                StorageRecord::StateUpdated { key, state } => {
                    states.apply_update(&key, state);
                }
            }
        }

        let checkpointer = Checkpointer::new(snapshot_path);

        Ok(Arc::new(Self { events, states, wal: Mutex::new(wal), checkpointer }))
    }

    fn dump(&self) -> StorageSnapshotData {
        StorageSnapshotData { events: self.events.dump(), states: self.states.dump() }
    }

    /// Take a synchronous checkpoint and truncate the WAL up to the
    /// checkpointed sequence. Intended for graceful shutdown.
    pub fn checkpoint_sync(&self) -> StorageResult<()> {
        let seq = {
            let wal = self.wal.lock();
            wal.write_seq()
        };
        let data = self.dump();
        self.checkpointer.checkpoint_sync(seq, &data)?;
        let mut wal = self.wal.lock();
        wal.mark_processed(seq);
        wal.truncate_before(seq)?;
        Ok(())
    }

    /// Kick off a background checkpoint without blocking the caller; the WAL
    /// is truncated once the checkpoint completes.
    pub fn checkpoint_async(self: &Arc<Self>) {
        let seq = {
            let wal = self.wal.lock();
            wal.write_seq()
        };
        let data = self.dump();
        let handle = self.checkpointer.start(seq, &data);
        let this = Arc::clone(self);
        std::thread::spawn(move || {
            if handle.wait().is_ok() {
                let mut wal = this.wal.lock();
                wal.mark_processed(seq);
                let _ = wal.truncate_before(seq);
            }
        });
    }

    fn log_and_flush(&self, record: StorageRecord) -> StorageResult<()> {
        let mut wal = self.wal.lock();
        wal.append(&record)?;
        wal.flush()?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileBackedExecutionStore {
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: Vec<HistoryEvent>,
        expected_version: i64,
    ) -> StorageResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        // Validate-and-apply to memory first; only a write that actually took
        // effect is journaled, so replay never re-applies a rejected write.
        self.events.append_events(key, events.clone(), expected_version).await?;
        self.log_and_flush(StorageRecord::EventsAppended { key: key.clone(), events })?;
        Ok(())
    }

    async fn get_events(&self, key: &ExecutionKey, first: i64, last: i64) -> StorageResult<Vec<HistoryEvent>> {
        self.events.get_events(key, first, last).await
    }

    async fn get_event_count(&self, key: &ExecutionKey) -> StorageResult<i64> {
        self.events.get_event_count(key).await
    }

    async fn get_latest_event_id(&self, key: &ExecutionKey) -> StorageResult<i64> {
        self.events.get_latest_event_id(key).await
    }

    async fn delete_events(&self, key: &ExecutionKey) -> StorageResult<()> {
        self.events.delete_events(key).await
    }
}

#[async_trait]
impl MutableStateStore for FileBackedExecutionStore {
    async fn get(&self, key: &ExecutionKey) -> StorageResult<MutableState> {
        self.states.get(key).await
    }

    async fn update(&self, key: &ExecutionKey, state: MutableState, expected_version: i64) -> StorageResult<()> {
        self.states.update(key, state.clone(), expected_version).await?;
        self.log_and_flush(StorageRecord::StateUpdated { key: key.clone(), state })?;
        Ok(())
    }

    async fn delete(&self, key: &ExecutionKey) -> StorageResult<()> {
        self.states.delete(key).await
    }

    async fn list_running(&self) -> StorageResult<Vec<ExecutionKey>> {
        self.states.list_running().await
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
