// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error envelope for the external RPC surface (§6, §7). Wraps the shared
//! [`CoreErrorKind`] taxonomy with a human-readable message so the wire
//! format carries enough to log and to map onto HTTP status codes without
//! leaking internal error types across the boundary.

use linkflow_core::CoreErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RpcError {
    pub kind: CoreErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Numeric status family from §6, derived from the shared taxonomy.
    pub fn status_code(&self) -> u16 {
        self.kind.http_status()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
