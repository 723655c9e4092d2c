// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, HistoryEvent};
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageResult};
use crate::event_store::EventStore;

/// Postgres-backed [`EventStore`] (§4.A).
///
/// Schema (see migrations):
/// ```sql
/// CREATE TABLE history_events (
///     namespace_id TEXT NOT NULL,
///     workflow_id  TEXT NOT NULL,
///     run_id       TEXT NOT NULL,
///     event_id     BIGINT NOT NULL,
///     event_type   TEXT NOT NULL,
///     version      BIGINT NOT NULL,
///     ts           TIMESTAMPTZ NOT NULL,
///     payload      JSONB NOT NULL,
///     PRIMARY KEY (namespace_id, workflow_id, run_id, event_id)
/// );
/// ```
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: Vec<HistoryEvent>,
        expected_version: i64,
    ) -> StorageResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        if expected_version >= 0 {
            let current_max: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(event_id), 0) FROM history_events \
                 WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3",
            )
            .bind(key.namespace_id.as_str())
            .bind(key.workflow_id.as_str())
            .bind(key.run_id.as_str())
            .fetch_one(&mut *tx)
            .await?;

            if current_max != expected_version {
                let already_applied: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM history_events \
                     WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3 AND event_id = ANY($4)",
                )
                .bind(key.namespace_id.as_str())
                .bind(key.workflow_id.as_str())
                .bind(key.run_id.as_str())
                .bind(events.iter().map(|e| e.event_id).collect::<Vec<_>>())
                .fetch_one(&mut *tx)
                .await?;

                if already_applied as usize != events.len() {
                    return Err(StorageError::VersionMismatch { expected: expected_version, actual: current_max });
                }
                tx.commit().await?;
                return Ok(());
            }
        }

        for event in &events {
            sqlx::query(
                "INSERT INTO history_events \
                 (namespace_id, workflow_id, run_id, event_id, event_type, version, ts, payload) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (namespace_id, workflow_id, run_id, event_id) DO NOTHING",
            )
            .bind(key.namespace_id.as_str())
            .bind(key.workflow_id.as_str())
            .bind(key.run_id.as_str())
            .bind(event.event_id)
            .bind(event.event_type.to_string())
            .bind(event.version)
            .bind(event.timestamp)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_events(&self, key: &ExecutionKey, first: i64, last: i64) -> StorageResult<Vec<HistoryEvent>> {
        let rows = sqlx::query(
            "SELECT event_id, event_type, version, ts, payload FROM history_events \
             WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3 \
               AND event_id >= $4 AND event_id <= $5 \
             ORDER BY event_id ASC",
        )
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_event).collect()
    }

    async fn get_event_count(&self, key: &ExecutionKey) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM history_events WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3",
        )
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn get_latest_event_id(&self, key: &ExecutionKey) -> StorageResult<i64> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(event_id), 0) FROM history_events \
             WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3",
        )
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn delete_events(&self, key: &ExecutionKey) -> StorageResult<()> {
        sqlx::query("DELETE FROM history_events WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3")
            .bind(key.namespace_id.as_str())
            .bind(key.workflow_id.as_str())
            .bind(key.run_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_event(row: sqlx::postgres::PgRow) -> StorageResult<HistoryEvent> {
    let event_type_str: String = row.get("event_type");
    let event_type = event_type_from_str(&event_type_str)?;
    Ok(HistoryEvent {
        event_id: row.get("event_id"),
        event_type,
        version: row.get("version"),
        timestamp: row.get("ts"),
        payload: row.get("payload"),
    })
}

fn event_type_from_str(s: &str) -> StorageResult<linkflow_core::HistoryEventType> {
    use linkflow_core::HistoryEventType::*;
    Ok(match s {
        "WorkflowStarted" => WorkflowStarted,
        "WorkflowCompleted" => WorkflowCompleted,
        "WorkflowFailed" => WorkflowFailed,
        "WorkflowCanceled" => WorkflowCanceled,
        "ActivityScheduled" => ActivityScheduled,
        "ActivityStarted" => ActivityStarted,
        "ActivityCompleted" => ActivityCompleted,
        "ActivityFailed" => ActivityFailed,
        "ActivityTimedOut" => ActivityTimedOut,
        "TimerStarted" => TimerStarted,
        "TimerFired" => TimerFired,
        "TimerCanceled" => TimerCanceled,
        "SignalReceived" => SignalReceived,
        "ContinueAsNew" => ContinueAsNew,
        other => {
            use serde::de::Error as _;
            return Err(StorageError::Serde(serde_json::Error::custom(format!("unknown event_type {other}"))));
        }
    })
}
