// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy (§7). Individual crates define their own
//! `thiserror` error types scoped to their own contract and convert into or
//! wrap [`CoreErrorKind`] where a caller needs to reason about the kind
//! across crate boundaries (e.g. the RPC layer mapping to HTTP status).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds from §7, shared vocabulary across crates. Individual crate
/// error enums carry this as a field or expose an equivalent `kind()` method
/// rather than re-deriving the taxonomy from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum CoreErrorKind {
    #[error("not found")]
    NotFound,
    #[error("version mismatch")]
    VersionMismatch,
    #[error("optimistic lock conflict")]
    OptimisticLock,
    #[error("queue full")]
    QueueFull,
    #[error("rate limited")]
    RateLimited,
    #[error("executor not found")]
    ExecutorNotFound,
    #[error("retryable failure")]
    Retryable,
    #[error("non-retryable failure")]
    NonRetryable,
    #[error("timeout")]
    Timeout,
    #[error("circuit open")]
    CircuitOpen,
    #[error("invalid workflow")]
    InvalidWorkflow,
    #[error("canceled")]
    Canceled,
    #[error("already exists")]
    AlreadyExists,
    #[error("checksum mismatch")]
    ChecksumMismatch,
}

impl CoreErrorKind {
    /// `Timeout` is treated as `Retryable` unless attempts are exhausted (§7).
    pub fn is_retryable(self) -> bool {
        matches!(self, CoreErrorKind::Retryable | CoreErrorKind::Timeout | CoreErrorKind::CircuitOpen)
    }

    /// Maps to the numeric status families in §6.
    pub fn http_status(self) -> u16 {
        match self {
            CoreErrorKind::NotFound => 404,
            CoreErrorKind::VersionMismatch | CoreErrorKind::OptimisticLock => 409,
            CoreErrorKind::AlreadyExists => 409,
            CoreErrorKind::QueueFull | CoreErrorKind::RateLimited => 429,
            CoreErrorKind::InvalidWorkflow => 422,
            CoreErrorKind::Canceled => 200,
            CoreErrorKind::ExecutorNotFound
            | CoreErrorKind::Retryable
            | CoreErrorKind::NonRetryable
            | CoreErrorKind::Timeout
            | CoreErrorKind::CircuitOpen
            | CoreErrorKind::ChecksumMismatch => 500,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
