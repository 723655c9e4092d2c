// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External RPC requests (§6). One variant per method the control plane can
//! invoke against a daemon instance.

use serde::{Deserialize, Serialize};

use crate::types::{
    CancelWorkflowRequest, ListExecutionsRequest, RetryExecutionRequest, SendSignalRequest,
    StartWorkflowRequest,
};
use crate::ExecutionRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    StartWorkflow(StartWorkflowRequest),
    GetExecution(ExecutionRef),
    CancelWorkflow(CancelWorkflowRequest),
    SendSignal(SendSignalRequest),
    RetryExecution(RetryExecutionRequest),
    ListOpenExecutions(ListExecutionsRequest),
    ListClosedExecutions(ListExecutionsRequest),
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
