// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, MutableState};
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageResult};
use crate::mutable_state_store::{checksum_of, ChecksumMode, MutableStateStore};

/// Postgres-backed [`MutableStateStore`] (§4.B).
///
/// Schema:
/// ```sql
/// CREATE TABLE mutable_state (
///     namespace_id TEXT NOT NULL,
///     workflow_id  TEXT NOT NULL,
///     run_id       TEXT NOT NULL,
///     db_version   BIGINT NOT NULL,
///     status       TEXT NOT NULL,
///     state        JSONB NOT NULL,
///     checksum     TEXT NOT NULL,
///     PRIMARY KEY (namespace_id, workflow_id, run_id)
/// );
/// ```
pub struct PostgresMutableStateStore {
    pool: PgPool,
    checksum_mode: ChecksumMode,
}

impl PostgresMutableStateStore {
    pub fn new(pool: PgPool, checksum_mode: ChecksumMode) -> Self {
        Self { pool, checksum_mode }
    }
}

#[async_trait]
impl MutableStateStore for PostgresMutableStateStore {
    async fn get(&self, key: &ExecutionKey) -> StorageResult<MutableState> {
        let row = sqlx::query(
            "SELECT state, checksum FROM mutable_state \
             WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3",
        )
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::ExecutionNotFound)?;

        let state_json: serde_json::Value = row.get("state");
        let expected_checksum: String = row.get("checksum");
        let state: MutableState = serde_json::from_value(state_json)?;

        let actual = checksum_of(&state)?;
        if actual != expected_checksum && self.checksum_mode == ChecksumMode::Strict {
            return Err(StorageError::ChecksumMismatch {
                key: format!("{}/{}/{}", key.namespace_id, key.workflow_id, key.run_id),
                expected: expected_checksum,
                actual,
            });
        }

        Ok(state)
    }

    async fn update(&self, key: &ExecutionKey, mut state: MutableState, expected_version: i64) -> StorageResult<()> {
        state.db_version = expected_version + 1;
        state.checksum = Some(checksum_of(&state)?);
        let checksum = state.checksum.clone().unwrap_or_default();
        let state_json = serde_json::to_value(&state)?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE mutable_state SET db_version = $1, status = $2, state = $3, checksum = $4 \
             WHERE namespace_id = $5 AND workflow_id = $6 AND run_id = $7 AND db_version = $8",
        )
        .bind(state.db_version)
        .bind(state.workflow_status.to_string())
        .bind(&state_json)
        .bind(&checksum)
        .bind(key.namespace_id.as_str())
        .bind(key.workflow_id.as_str())
        .bind(key.run_id.as_str())
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            if expected_version != 0 {
                return Err(StorageError::OptimisticLock { expected: expected_version });
            }

            let inserted = sqlx::query(
                "INSERT INTO mutable_state (namespace_id, workflow_id, run_id, db_version, status, state, checksum) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (namespace_id, workflow_id, run_id) DO NOTHING",
            )
            .bind(key.namespace_id.as_str())
            .bind(key.workflow_id.as_str())
            .bind(key.run_id.as_str())
            .bind(state.db_version)
            .bind(state.workflow_status.to_string())
            .bind(&state_json)
            .bind(&checksum)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(StorageError::OptimisticLock { expected: expected_version });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, key: &ExecutionKey) -> StorageResult<()> {
        sqlx::query("DELETE FROM mutable_state WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3")
            .bind(key.namespace_id.as_str())
            .bind(key.workflow_id.as_str())
            .bind(key.run_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_running(&self) -> StorageResult<Vec<ExecutionKey>> {
        let terminal: &[&str] = &["completed", "failed", "canceled", "timed_out"];
        let rows = sqlx::query(
            "SELECT namespace_id, workflow_id, run_id FROM mutable_state WHERE status != ALL($1)",
        )
        .bind(terminal)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                ExecutionKey::new(
                    linkflow_core::NamespaceId::new(row.get::<String, _>("namespace_id")),
                    linkflow_core::WorkflowId::new(row.get::<String, _>("workflow_id")),
                    linkflow_core::RunId::from_string(row.get::<String, _>("run_id")),
                )
            })
            .collect())
    }
}
