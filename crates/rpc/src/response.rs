// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External RPC responses (§6). One successful variant per [`crate::Request`]
//! method, plus a shared `Error` variant carrying an [`RpcError`].

use serde::{Deserialize, Serialize};

use crate::status::RpcError;
use crate::types::{ExecutionInfo, ListExecutionsResponse, RetryExecutionResponse, StartWorkflowResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    StartWorkflow(StartWorkflowResponse),
    Execution(ExecutionInfo),
    Canceled,
    SignalSent,
    RetryExecution(RetryExecutionResponse),
    Executions(ListExecutionsResponse),
    Error(RpcError),
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
