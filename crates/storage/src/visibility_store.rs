// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Visibility (listing) store contract and in-memory implementation (§4.I).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkflow_core::{NamespaceId, PageToken, RunId, VisibilityRecord, WorkflowStatus};
use parking_lot::Mutex;

use crate::error::StorageResult;

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

/// A page of visibility results plus an opaque token for the next page, if any.
#[derive(Debug, Clone)]
pub struct VisibilityPage {
    pub records: Vec<VisibilityRecord>,
    pub next_page_token: Option<String>,
}

/// Denormalized listing of executions within a namespace, ordered by
/// `start_time` descending with keyset pagination on `(start_time, run_id)` (§4.I).
#[async_trait]
pub trait VisibilityStore: Send + Sync {
    async fn record_started(&self, record: VisibilityRecord) -> StorageResult<()>;

    async fn record_closed(
        &self,
        namespace_id: &NamespaceId,
        run_id: &RunId,
        close_time: DateTime<Utc>,
        status: WorkflowStatus,
        history_length: i64,
    ) -> StorageResult<()>;

    async fn list_open(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage>;

    async fn list_closed(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage>;
}

#[derive(Default)]
struct NamespaceRows {
    rows: Vec<VisibilityRecord>,
}

/// In-memory [`VisibilityStore`], suitable for tests and local DAG execution.
#[derive(Default)]
pub struct InMemoryVisibilityStore {
    namespaces: Mutex<HashMap<String, NamespaceRows>>,
}

impl InMemoryVisibilityStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn paginate(
        rows: &[VisibilityRecord],
        page_size: usize,
        page_token: Option<&str>,
    ) -> VisibilityPage {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size.min(MAX_PAGE_SIZE) };

        let mut sorted: Vec<&VisibilityRecord> = rows.iter().collect();
        sorted.sort_by(|a, b| {
            b.start_time.cmp(&a.start_time).then_with(|| b.run_id.as_str().cmp(a.run_id.as_str()))
        });

        let start_index = match page_token.and_then(PageToken::decode) {
            Some(token) => sorted
                .iter()
                .position(|r| {
                    (r.start_time, r.run_id.as_str()) < (token.timestamp, token.run_id.as_str())
                })
                .unwrap_or(sorted.len()),
            None => 0,
        };

        let page: Vec<VisibilityRecord> =
            sorted[start_index..].iter().take(page_size).map(|r| (*r).clone()).collect();

        let next_page_token = if start_index + page.len() < sorted.len() {
            page.last().map(|last| PageToken { timestamp: last.start_time, run_id: last.run_id.clone() }.encode())
        } else {
            None
        };

        VisibilityPage { records: page, next_page_token }
    }
}

#[async_trait]
impl VisibilityStore for InMemoryVisibilityStore {
    async fn record_started(&self, record: VisibilityRecord) -> StorageResult<()> {
        let mut namespaces = self.namespaces.lock();
        let entry = namespaces.entry(record.namespace_id.to_string()).or_default();
        entry.rows.retain(|r| r.run_id != record.run_id);
        entry.rows.push(record);
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
        let mut namespaces = self.namespaces.lock();
        if let Some(entry) = namespaces.get_mut(namespace_id.as_str()) {
            if let Some(record) = entry.rows.iter_mut().find(|r| &r.run_id == run_id) {
                record.close_time = Some(close_time);
                record.status = status;
                record.history_length = Some(history_length);
            }
        }
        Ok(())
    }

    async fn list_open(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage> {
        let namespaces = self.namespaces.lock();
        let open: Vec<VisibilityRecord> = namespaces
            .get(namespace_id.as_str())
            .map(|entry| entry.rows.iter().filter(|r| r.is_open()).cloned().collect())
            .unwrap_or_default();
        Ok(Self::paginate(&open, page_size, page_token))
    }

    async fn list_closed(
        &self,
        namespace_id: &NamespaceId,
        page_size: usize,
        page_token: Option<&str>,
    ) -> StorageResult<VisibilityPage> {
        let namespaces = self.namespaces.lock();
        let closed: Vec<VisibilityRecord> = namespaces
            .get(namespace_id.as_str())
            .map(|entry| entry.rows.iter().filter(|r| !r.is_open()).cloned().collect())
            .unwrap_or_default();
        Ok(Self::paginate(&closed, page_size, page_token))
    }
}

#[cfg(test)]
#[path = "visibility_store_tests.rs"]
mod tests;
