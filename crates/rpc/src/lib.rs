// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External RPC protocol for the LinkFlow execution core (§6).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod status;
mod types;
mod wire;

pub use request::Request;
pub use response::Response;
pub use status::RpcError;
pub use types::{
    CancelWorkflowRequest, ExecutionInfo, ExecutionRef, ExecutionSummary, ListExecutionsRequest,
    ListExecutionsResponse, RetryExecutionRequest, RetryExecutionResponse, SendSignalRequest,
    StartWorkflowRequest, StartWorkflowResponse,
};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, MAX_FRAME_BYTES,
};
