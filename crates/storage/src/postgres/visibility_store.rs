// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkflow_core::{NamespaceId, PageToken, RunId, VisibilityRecord, WorkflowStatus};
use sqlx::{PgPool, Row};

use crate::error::StorageResult;
use crate::visibility_store::{VisibilityPage, VisibilityStore};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

/// Postgres-backed [`VisibilityStore`] (§4.I).
///
/// Schema:
/// ```sql
/// CREATE TABLE visibility (
///     namespace_id   TEXT NOT NULL,
///     workflow_id    TEXT NOT NULL,
///     run_id         TEXT NOT NULL,
///     workflow_type  TEXT NOT NULL,
///     start_time     TIMESTAMPTZ NOT NULL,
///     close_time     TIMESTAMPTZ,
///     status         TEXT NOT NULL,
///     history_length BIGINT,
///     memo           JSONB NOT NULL,
///     PRIMARY KEY (namespace_id, run_id)
/// );
/// CREATE INDEX visibility_open_idx ON visibility (namespace_id, start_time DESC, run_id DESC) WHERE close_time IS NULL;
/// CREATE INDEX visibility_closed_idx ON visibility (namespace_id, start_time DESC, run_id DESC) WHERE close_time IS NOT NULL;
/// ```
pub struct PostgresVisibilityStore {
    pool: PgPool,
}

impl PostgresVisibilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(
        &self,
        namespace_id: &NamespaceId,
        open: bool,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage> {
        let limit = if page_size == 0 { DEFAULT_PAGE_SIZE } else { (page_size as i64).min(MAX_PAGE_SIZE) };
        let closed_predicate = if open { "close_time IS NULL" } else { "close_time IS NOT NULL" };
        let token = page_token.and_then(PageToken::decode);

        let rows = match &token {
            Some(t) => {
                let query = format!(
                    "SELECT namespace_id, workflow_id, run_id, workflow_type, start_time, close_time, \
                            status, history_length, memo \
                     FROM visibility \
                     WHERE namespace_id = $1 AND {closed_predicate} \
                       AND (start_time, run_id) < ($2, $3) \
                     ORDER BY start_time DESC, run_id DESC \
                     LIMIT $4"
                );
                sqlx::query(&query)
                    .bind(namespace_id.as_str())
                    .bind(t.timestamp)
                    .bind(t.run_id.as_str())
                    .bind(limit + 1)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT namespace_id, workflow_id, run_id, workflow_type, start_time, close_time, \
                            status, history_length, memo \
                     FROM visibility \
                     WHERE namespace_id = $1 AND {closed_predicate} \
                     ORDER BY start_time DESC, run_id DESC \
                     LIMIT $2"
                );
                sqlx::query(&query).bind(namespace_id.as_str()).bind(limit + 1).fetch_all(&self.pool).await?
            }
        };

        let has_more = rows.len() as i64 > limit;
        let mut records: Vec<VisibilityRecord> = rows.into_iter().take(limit as usize).map(row_to_record).collect();
        records.truncate(limit as usize);

        let next_page_token = if has_more {
            records
                .last()
                .map(|last| PageToken { timestamp: last.start_time, run_id: last.run_id.clone() }.encode())
        } else {
            None
        };

        Ok(VisibilityPage { records, next_page_token })
    }
}

#[async_trait]
impl VisibilityStore for PostgresVisibilityStore {
    async fn record_started(&self, record: VisibilityRecord) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO visibility \
             (namespace_id, workflow_id, run_id, workflow_type, start_time, close_time, status, history_length, memo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (namespace_id, run_id) DO UPDATE SET \
                workflow_type = EXCLUDED.workflow_type, start_time = EXCLUDED.start_time, memo = EXCLUDED.memo",
        )
        .bind(record.namespace_id.as_str())
        .bind(record.workflow_id.as_str())
        .bind(record.run_id.as_str())
        .bind(&record.workflow_type)
        .bind(record.start_time)
        .bind(record.close_time)
        .bind(record.status.to_string())
        .bind(record.history_length)
        .bind(&record.memo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_closed(
        &self,
        namespace_id: &NamespaceId,
        run_id: &RunId,
        close_time: DateTime<Utc>,
        status: WorkflowStatus,
        history_length: i64,
    ) -> StorageResult<()> {
        sqlx::query(
            "UPDATE visibility SET close_time = $1, status = $2, history_length = $3 \
             WHERE namespace_id = $4 AND run_id = $5",
        )
        .bind(close_time)
        .bind(status.to_string())
        .bind(history_length)
        .bind(namespace_id.as_str())
        .bind(run_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_open(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage> {
        self.list(namespace_id, true, page_size, page_token).await
    }

    async fn list_closed(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage> {
        self.list(namespace_id, false, page_size, page_token).await
    }
}

fn row_to_record(row: sqlx::postgres::PgRow) -> VisibilityRecord {
    VisibilityRecord {
        namespace_id: NamespaceId::new(row.get::<String, _>("namespace_id")),
        workflow_id: linkflow_core::WorkflowId::new(row.get::<String, _>("workflow_id")),
        run_id: RunId::from_string(row.get::<String, _>("run_id")),
        workflow_type: row.get("workflow_type"),
        start_time: row.get("start_time"),
        close_time: row.get("close_time"),
        status: status_from_str(&row.get::<String, _>("status")),
        history_length: row.get("history_length"),
        memo: row.get("memo"),
    }
}

fn status_from_str(s: &str) -> WorkflowStatus {
    match s {
        "pending" => WorkflowStatus::Pending,
        "running" => WorkflowStatus::Running,
        "waiting" => WorkflowStatus::Waiting,
        "completed" => WorkflowStatus::Completed,
        "failed" => WorkflowStatus::Failed,
        "canceled" => WorkflowStatus::Canceled,
        _ => WorkflowStatus::TimedOut,
    }
}
