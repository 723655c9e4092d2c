// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutable State Store contract and in-memory implementation (§4.B).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, MutableState};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::{StorageError, StorageResult};

/// How a checksum mismatch on read is handled (§9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumMode {
    /// Return [`StorageError::ChecksumMismatch`].
    Strict,
    /// Log (by the caller) and return the state anyway.
    LogOnly,
}

/// Current per-execution state snapshot with optimistic versioning (§4.B).
#[async_trait]
pub trait MutableStateStore: Send + Sync {
    /// Returns [`StorageError::ExecutionNotFound`] when absent. Collection
    /// fields are normalized to empty containers rather than null/absent.
    async fn get(&self, key: &ExecutionKey) -> StorageResult<MutableState>;

    /// Serializes `state`, computes its checksum, and applies
    /// `UPDATE ... SET db_version = expected + 1 WHERE db_version = expected`.
    /// If zero rows affected and `expected_version == 0`, attempts an insert;
    /// otherwise fails with [`StorageError::OptimisticLock`].
    async fn update(
        &self,
        key: &ExecutionKey,
        state: MutableState,
        expected_version: i64,
    ) -> StorageResult<()>;

    async fn delete(&self, key: &ExecutionKey) -> StorageResult<()>;

    /// Crash recovery: every run whose status is non-terminal.
    async fn list_running(&self) -> StorageResult<Vec<ExecutionKey>>;
}

pub fn checksum_of(state: &MutableState) -> StorageResult<String> {
    let mut unchecksummed = state.clone();
    unchecksummed.checksum = None;
    let bytes = serde_json::to_vec(&unchecksummed)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Clone)]
struct StoredState {
    key: ExecutionKey,
    state: MutableState,
}

/// In-memory [`MutableStateStore`], suitable for tests and local DAG
/// execution (§9).
pub struct InMemoryMutableStateStore {
    rows: Mutex<HashMap<String, StoredState>>,
    checksum_mode: ChecksumMode,
}

impl InMemoryMutableStateStore {
    pub fn new(checksum_mode: ChecksumMode) -> Arc<Self> {
        Arc::new(Self { rows: Mutex::new(HashMap::new()), checksum_mode })
    }

    fn row_key(key: &ExecutionKey) -> String {
        format!("{}/{}/{}", key.namespace_id, key.workflow_id, key.run_id)
    }
}

impl Default for InMemoryMutableStateStore {
    fn default() -> Self {
        Self { rows: Mutex::new(HashMap::new()), checksum_mode: ChecksumMode::Strict }
    }
}

#[async_trait]
impl MutableStateStore for InMemoryMutableStateStore {
    async fn get(&self, key: &ExecutionKey) -> StorageResult<MutableState> {
        let rows = self.rows.lock();
        let row = rows.get(&Self::row_key(key)).ok_or(StorageError::ExecutionNotFound)?;
        let state = row.state.clone();
        if let Some(expected) = state.checksum.clone() {
            let actual = checksum_of(&state)?;
            if actual != expected && self.checksum_mode == ChecksumMode::Strict {
                return Err(StorageError::ChecksumMismatch {
                    key: Self::row_key(key),
                    expected,
                    actual,
                });
            }
        }
        Ok(state)
    }

    async fn update(
        &self,
        key: &ExecutionKey,
        mut state: MutableState,
        expected_version: i64,
    ) -> StorageResult<()> {
        let mut rows = self.rows.lock();
        let row_key = Self::row_key(key);

        match rows.get(&row_key) {
            Some(existing) if existing.state.db_version != expected_version => {
                return Err(StorageError::OptimisticLock { expected: expected_version });
            }
            None if expected_version != 0 => {
                return Err(StorageError::OptimisticLock { expected: expected_version });
            }
            _ => {}
        }

        state.db_version = expected_version + 1;
        state.checksum = Some(checksum_of(&state)?);
        rows.insert(row_key, StoredState { key: key.clone(), state });
        Ok(())
    }

    async fn delete(&self, key: &ExecutionKey) -> StorageResult<()> {
        self.rows.lock().remove(&Self::row_key(key));
        Ok(())
    }

    async fn list_running(&self) -> StorageResult<Vec<ExecutionKey>> {
        let rows = self.rows.lock();
        Ok(rows
            .values()
            .filter(|row| !row.state.is_terminal())
            .map(|row| row.key.clone())
            .collect())
    }
}

impl InMemoryMutableStateStore {
    /// Snapshot the full contents, for checkpointing.
    pub(crate) fn dump(&self) -> HashMap<String, (ExecutionKey, MutableState)> {
        self.rows.lock().iter().map(|(k, v)| (k.clone(), (v.key.clone(), v.state.clone()))).collect()
    }

    /// Replace the full contents, for recovery.
    pub(crate) fn restore(&self, data: HashMap<String, (ExecutionKey, MutableState)>) {
        let mut rows = self.rows.lock();
        rows.clear();
        for (row_key, (key, state)) in data {
            rows.insert(row_key, StoredState { key, state });
        }
    }

    /// Apply an already-durable update without re-checking the expected
    /// version; used to replay WAL entries during recovery.
    pub(crate) fn apply_update(&self, key: &ExecutionKey, state: MutableState) {
        self.rows.lock().insert(Self::row_key(key), StoredState { key: key.clone(), state });
    }
}

#[cfg(test)]
#[path = "mutable_state_store_tests.rs"]
mod tests;
