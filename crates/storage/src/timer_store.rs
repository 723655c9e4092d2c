// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer store contract and in-memory implementation (§4.C), consumed by
//! the per-shard timer scan loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkflow_core::{ExecutionKey, Timer, TimerId, TimerStatus};
use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};

/// Durable timers, scoped by `shard_id` so a single scan loop owns a
/// contiguous subset of the timer space (§4.C).
#[async_trait]
pub trait TimerStore: Send + Sync {
    /// Fails with [`StorageError::AlreadyExists`] on a duplicate `timer_id`
    /// within the same run.
    async fn insert(&self, timer: Timer) -> StorageResult<()>;

    /// `UPDATE ... SET status = ..., version = version + 1 WHERE version =
    /// expected_version`, failing with [`StorageError::OptimisticLock`] on
    /// mismatch.
    async fn update_status(
        &self,
        key: &ExecutionKey,
        timer_id: &TimerId,
        status: TimerStatus,
        now: Option<DateTime<Utc>>,
        expected_version: i64,
    ) -> StorageResult<()>;

    /// Pending timers in `shard_id` with `fire_time <= now`, up to `limit`,
    /// excluding any id in `leased_out` (emulates `FOR UPDATE SKIP LOCKED`
    /// for the in-memory implementation: callers lease what they claim).
    async fn fetch_due(&self, shard_id: u32, now: DateTime<Utc>, limit: usize) -> StorageResult<Vec<Timer>>;

    /// Permanently remove terminal timers older than `now - retention`, used
    /// by retention sweeps.
    async fn purge_terminal_before(&self, shard_id: u32, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    /// Cancels a still-pending timer (§4.F: workflow cancellation). Identity-based
    /// rather than version-CAS'd: a timer that already fired is left alone
    /// rather than erroring, since the engine has no prior read to race against.
    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId, now: DateTime<Utc>) -> StorageResult<()>;
}

fn timer_key(key: &ExecutionKey, timer_id: &TimerId) -> String {
    format!("{}/{}/{}/{}", key.namespace_id, key.workflow_id, key.run_id, timer_id)
}

/// In-memory [`TimerStore`]. A lease set stands in for `SELECT ... FOR
/// UPDATE SKIP LOCKED`: [`InMemoryTimerStore::fetch_due`] atomically marks
/// returned timers leased so a concurrent scanner on the same shard skips
/// them until [`InMemoryTimerStore::release_lease`] or a status update.
#[derive(Default)]
pub struct InMemoryTimerStore {
    timers: Mutex<HashMap<String, Timer>>,
    leased: Mutex<std::collections::HashSet<String>>,
}

impl InMemoryTimerStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Release a lease taken by [`TimerStore::fetch_due`] without changing status.
    pub fn release_lease(&self, key: &ExecutionKey, timer_id: &TimerId) {
        self.leased.lock().remove(&timer_key(key, timer_id));
    }
}

#[async_trait]
impl TimerStore for InMemoryTimerStore {
    async fn insert(&self, timer: Timer) -> StorageResult<()> {
        let execution_key =
            ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
        let key = timer_key(&execution_key, &timer.timer_id);
        let mut timers = self.timers.lock();
        if timers.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        timers.insert(key, timer);
        Ok(())
    }

    async fn update_status(
        &self,
        key: &ExecutionKey,
        timer_id: &TimerId,
        status: TimerStatus,
        now: Option<DateTime<Utc>>,
        expected_version: i64,
    ) -> StorageResult<()> {
        let storage_key = timer_key(key, timer_id);
        let mut timers = self.timers.lock();
        let timer = timers.get_mut(&storage_key).ok_or(StorageError::TimerNotFound)?;
        if timer.version != expected_version {
            return Err(StorageError::OptimisticLock { expected: expected_version });
        }
        timer.status = status;
        timer.version += 1;
        if status == TimerStatus::Fired {
            timer.fired_at = now;
        }
        self.leased.lock().remove(&storage_key);
        Ok(())
    }

    async fn fetch_due(&self, shard_id: u32, now: DateTime<Utc>, limit: usize) -> StorageResult<Vec<Timer>> {
        let timers = self.timers.lock();
        let mut leased = self.leased.lock();

        let mut due: Vec<(String, Timer)> = timers
            .iter()
            .filter(|(k, t)| t.shard_id == shard_id && t.is_due(now) && !leased.contains(*k))
            .map(|(k, t)| (k.clone(), t.clone()))
            .collect();
        due.sort_by(|a, b| a.1.fire_time.cmp(&b.1.fire_time));
        due.truncate(limit);

        for (k, _) in &due {
            leased.insert(k.clone());
        }

        Ok(due.into_iter().map(|(_, t)| t).collect())
    }

    async fn purge_terminal_before(&self, shard_id: u32, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let mut timers = self.timers.lock();
        let before = timers.len();
        timers.retain(|_, t| {
            !(t.shard_id == shard_id && t.status.is_terminal() && t.fired_at.map(|f| f < cutoff).unwrap_or(false))
        });
        Ok((before - timers.len()) as u64)
    }

    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId, now: DateTime<Utc>) -> StorageResult<()> {
        let storage_key = timer_key(key, timer_id);
        let mut timers = self.timers.lock();
        let Some(timer) = timers.get_mut(&storage_key) else {
            return Ok(());
        };
        if timer.status == TimerStatus::Pending {
            timer.status = TimerStatus::Canceled;
            timer.version += 1;
            timer.fired_at = Some(now);
        }
        self.leased.lock().remove(&storage_key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "timer_store_tests.rs"]
mod tests;
