// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Store contract and in-memory implementation (§4.A).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, HistoryEvent};
use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};

/// Append-only history of [`HistoryEvent`]s per execution, idempotent by
/// `(run, event_id)` (§4.A).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Transactional append. When `expected_version >= 0`, requires
    /// `expected_version == current max event_id` before inserting; a unique
    /// key violation on `(run_id, event_id)` for an already-applied event is
    /// treated as idempotent success.
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: Vec<HistoryEvent>,
        expected_version: i64,
    ) -> StorageResult<()>;

    /// Ordered ascending by `event_id`; inclusive bounds; empty if none.
    async fn get_events(
        &self,
        key: &ExecutionKey,
        first: i64,
        last: i64,
    ) -> StorageResult<Vec<HistoryEvent>>;

    async fn get_event_count(&self, key: &ExecutionKey) -> StorageResult<i64>;

    async fn get_latest_event_id(&self, key: &ExecutionKey) -> StorageResult<i64>;

    /// Used only by retention.
    async fn delete_events(&self, key: &ExecutionKey) -> StorageResult<()>;
}

fn run_key(key: &ExecutionKey) -> String {
    format!("{}/{}/{}", key.namespace_id, key.workflow_id, key.run_id)
}

/// In-memory [`EventStore`], suitable for tests and local DAG execution (§9).
#[derive(Default)]
pub struct InMemoryEventStore {
    runs: Mutex<HashMap<String, Vec<HistoryEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: Vec<HistoryEvent>,
        expected_version: i64,
    ) -> StorageResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut runs = self.runs.lock();
        let history = runs.entry(run_key(key)).or_default();
        let current_max = history.last().map(|e| e.event_id).unwrap_or(0);

        if expected_version >= 0 && expected_version != current_max {
            // A retried request re-appending exactly the events already
            // present is idempotent success, not a version conflict.
            let already_applied = events.iter().all(|e| {
                history.iter().any(|existing| existing.event_id == e.event_id)
            });
            if already_applied {
                return Ok(());
            }
            return Err(StorageError::VersionMismatch { expected: expected_version, actual: current_max });
        }

        for event in events {
            if history.iter().any(|existing| existing.event_id == event.event_id) {
                continue; // idempotent: already durable from a retried request
            }
            history.push(event);
        }
        history.sort_by_key(|e| e.event_id);
        Ok(())
    }

    async fn get_events(
        &self,
        key: &ExecutionKey,
        first: i64,
        last: i64,
    ) -> StorageResult<Vec<HistoryEvent>> {
        let runs = self.runs.lock();
        Ok(runs
            .get(&run_key(key))
            .map(|history| {
                history
                    .iter()
                    .filter(|e| e.event_id >= first && e.event_id <= last)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_event_count(&self, key: &ExecutionKey) -> StorageResult<i64> {
        let runs = self.runs.lock();
        Ok(runs.get(&run_key(key)).map(|h| h.len() as i64).unwrap_or(0))
    }

    async fn get_latest_event_id(&self, key: &ExecutionKey) -> StorageResult<i64> {
        let runs = self.runs.lock();
        Ok(runs.get(&run_key(key)).and_then(|h| h.last()).map(|e| e.event_id).unwrap_or(0))
    }

    async fn delete_events(&self, key: &ExecutionKey) -> StorageResult<()> {
        self.runs.lock().remove(&run_key(key));
        Ok(())
    }
}

impl InMemoryEventStore {
    /// Snapshot the full contents, for checkpointing.
    pub(crate) fn dump(&self) -> HashMap<String, Vec<HistoryEvent>> {
        self.runs.lock().clone()
    }

    /// Replace the full contents, for recovery.
    pub(crate) fn restore(&self, data: HashMap<String, Vec<HistoryEvent>>) {
        *self.runs.lock() = data;
    }

    /// Apply a single already-durable append without re-checking the
    /// expected version; used to replay WAL entries during recovery.
    pub(crate) fn apply_append(&self, key: &ExecutionKey, events: Vec<HistoryEvent>) {
        let mut runs = self.runs.lock();
        let history = runs.entry(run_key(key)).or_default();
        for event in events {
            if history.iter().any(|existing| existing.event_id == event.event_id) {
                continue;
            }
            history.push(event);
        }
        history.sort_by_key(|e| e.event_id);
    }
}

#[cfg(test)]
#[path = "event_store_tests.rs"]
mod tests;
