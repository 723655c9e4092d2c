// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps internal error types onto the RPC surface's [`RpcError`] envelope (§6, §7).

use linkflow_core::CoreErrorKind;
use linkflow_engine::EngineError;
use linkflow_rpc::RpcError;
use linkflow_storage::StorageError;

pub fn engine_error_to_rpc(err: EngineError) -> RpcError {
    let kind = match &err {
        EngineError::InvalidWorkflow(_) => CoreErrorKind::InvalidWorkflow,
        EngineError::Storage(storage_err) => storage_err.kind(),
        EngineError::Conflict => CoreErrorKind::OptimisticLock,
        EngineError::AlreadyTerminal => CoreErrorKind::NonRetryable,
        EngineError::UnknownActivity(_) | EngineError::UnknownTimer(_) => CoreErrorKind::NotFound,
    };
    RpcError::new(kind, err.to_string())
}

pub fn storage_error_to_rpc(err: StorageError) -> RpcError {
    let kind = err.kind();
    RpcError::new(kind, err.to_string())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
