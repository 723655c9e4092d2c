// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the external RPC surface (§6). Thin, serializable wrappers over
//! the engine's own types so the wire format can evolve independently of
//! internal representations.

use chrono::{DateTime, Utc};
use linkflow_core::{ExecutionKey, NamespaceId, RunId, WorkflowId, WorkflowStatus};
use linkflow_workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};

/// Request body for starting a new execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    pub namespace_id: NamespaceId,
    pub workflow_id: WorkflowId,
    pub workflow_type: String,
    pub definition: WorkflowDefinition,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartWorkflowResponse {
    pub run_id: RunId,
    /// `false` when a prior start with the same idempotency key already
    /// exists and `run_id` refers to that earlier run.
    pub started: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRef {
    pub namespace_id: NamespaceId,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
}

impl From<ExecutionRef> for ExecutionKey {
    fn from(r: ExecutionRef) -> Self {
        ExecutionKey { namespace_id: r.namespace_id, workflow_id: r.workflow_id, run_id: r.run_id }
    }
}

impl From<&ExecutionKey> for ExecutionRef {
    fn from(key: &ExecutionKey) -> Self {
        ExecutionRef {
            namespace_id: key.namespace_id.clone(),
            workflow_id: key.workflow_id.clone(),
            run_id: key.run_id.clone(),
        }
    }
}

/// Snapshot returned by `GetExecution`, assembled from [`linkflow_core::MutableState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionInfo {
    pub execution: ExecutionRef,
    pub workflow_type: String,
    pub status: WorkflowStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub history_length: i64,
    pub current_input: serde_json::Value,
    pub failed_node_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelWorkflowRequest {
    pub execution: ExecutionRef,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendSignalRequest {
    pub execution: ExecutionRef,
    pub signal_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Starts a fresh run of the same `(namespace_id, workflow_id)` under a new
/// `run_id`, reusing the closed run's last recorded input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryExecutionRequest {
    pub execution: ExecutionRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryExecutionResponse {
    pub run_id: RunId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListExecutionsRequest {
    pub namespace_id: NamespaceId,
    #[serde(default)]
    pub page_size: usize,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub execution: ExecutionRef,
    pub workflow_type: String,
    pub status: WorkflowStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListExecutionsResponse {
    pub executions: Vec<ExecutionSummary>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
