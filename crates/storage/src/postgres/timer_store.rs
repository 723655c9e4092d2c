// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkflow_core::{ExecutionKey, NamespaceId, RunId, Timer, TimerId, TimerStatus, WorkflowId};
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageResult};
use crate::timer_store::TimerStore;

/// Postgres-backed [`TimerStore`] (§4.C).
///
/// Schema:
/// ```sql
/// CREATE TABLE timers (
///     shard_id     INTEGER NOT NULL,
///     namespace_id TEXT NOT NULL,
///     workflow_id  TEXT NOT NULL,
///     run_id       TEXT NOT NULL,
///     timer_id     TEXT NOT NULL,
///     fire_time    TIMESTAMPTZ NOT NULL,
///     status       TEXT NOT NULL,
///     version      BIGINT NOT NULL,
///     created_at   TIMESTAMPTZ NOT NULL,
///     fired_at     TIMESTAMPTZ,
///     PRIMARY KEY (namespace_id, workflow_id, run_id, timer_id)
/// );
/// CREATE INDEX timers_due_idx ON timers (shard_id, fire_time) WHERE status = 'pending';
/// ```
pub struct PostgresTimerStore {
    pool: PgPool,
}

impl PostgresTimerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimerStore for PostgresTimerStore {
    async fn insert(&self, timer: Timer) -> StorageResult<()> {
        let result = sqlx::query(
            "INSERT INTO timers \
             (shard_id, namespace_id, workflow_id, run_id, timer_id, fire_time, status, version, created_at, fired_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (namespace_id, workflow_id, run_id, timer_id) DO NOTHING",
        )
        .bind(timer.shard_id as i32)
        .bind(timer.namespace_id.as_str())
        .bind(timer.workflow_id.as_str())
        .bind(timer.run_id.as_str())
        .bind(timer.timer_id.as_str())
        .bind(timer.fire_time)
        .bind(timer.status.to_string())
        .bind(timer.version)
        .bind(timer.created_at)
        .bind(timer.fired_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::AlreadyExists(format!(
                "{}/{}/{}/{}",
                timer.namespace_id, timer.workflow_id, timer.run_id, timer.timer_id
            )));
        }
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
        let result = sqlx::query(
            "UPDATE timers SET status = $1, version = version + 1, fired_at = COALESCE($2, fired_at) \
             WHERE namespace_id = $3 AND workflow_id = $4 AND run_id = $5 AND timer_id = $6 AND version = $7",
        )
        .bind(status.to_string())
        .bind(now)
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .bind(timer_id.as_str())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::OptimisticLock { expected: expected_version });
        }
        Ok(())
    }

    async fn fetch_due(&self, shard_id: u32, now: DateTime<Utc>, limit: usize) -> StorageResult<Vec<Timer>> {
        let rows = sqlx::query(
            "SELECT shard_id, namespace_id, workflow_id, run_id, timer_id, fire_time, status, version, \
                    created_at, fired_at \
             FROM timers \
             WHERE shard_id = $1 AND status = 'pending' AND fire_time <= $2 \
             ORDER BY fire_time ASC \
             LIMIT $3 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(shard_id as i32)
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_timer).collect()
    }

    async fn purge_terminal_before(&self, shard_id: u32, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query(
            "DELETE FROM timers \
             WHERE shard_id = $1 AND status IN ('fired', 'canceled') AND fired_at < $2",
        )
        .bind(shard_id as i32)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId, now: DateTime<Utc>) -> StorageResult<()> {
        sqlx::query(
            "UPDATE timers SET status = 'canceled', version = version + 1, fired_at = $1 \
             WHERE namespace_id = $2 AND workflow_id = $3 AND run_id = $4 AND timer_id = $5 AND status = 'pending'",
        )
        .bind(now)
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .bind(timer_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_timer(row: sqlx::postgres::PgRow) -> StorageResult<Timer> {
    let status_str: String = row.get("status");
    let status = match status_str.as_str() {
        "pending" => TimerStatus::Pending,
        "fired" => TimerStatus::Fired,
        "canceled" => TimerStatus::Canceled,
        other => {
            use serde::de::Error as _;
            return Err(StorageError::Serde(serde_json::Error::custom(format!("unknown timer status {other}"))));
        }
    };

    Ok(Timer {
        shard_id: row.get::<i32, _>("shard_id") as u32,
        namespace_id: NamespaceId::new(row.get::<String, _>("namespace_id")),
        workflow_id: WorkflowId::new(row.get::<String, _>("workflow_id")),
        run_id: RunId::from_string(row.get::<String, _>("run_id")),
        timer_id: TimerId::new(row.get::<String, _>("timer_id")),
        fire_time: row.get("fire_time"),
        status,
        version: row.get("version"),
        created_at: row.get("created_at"),
        fired_at: row.get("fired_at"),
    })
}
