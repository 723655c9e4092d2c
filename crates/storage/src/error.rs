// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the storage contracts (§4.A, §4.B, §4.I, §7).

use linkflow_core::CoreErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("execution not found")]
    ExecutionNotFound,
    #[error("timer not found")]
    TimerNotFound,
    #[error("append rejected: expected_version {expected}, actual max event_id {actual}")]
    VersionMismatch { expected: i64, actual: i64 },
    #[error("optimistic lock conflict: expected db_version {expected}")]
    OptimisticLock { expected: i64 },
    #[error("timer {0} already exists")]
    AlreadyExists(String),
    #[error("checksum mismatch for {key}: expected {expected}, got {actual}")]
    ChecksumMismatch { key: String, expected: String, actual: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn kind(&self) -> CoreErrorKind {
        match self {
            StorageError::ExecutionNotFound | StorageError::TimerNotFound => CoreErrorKind::NotFound,
            StorageError::VersionMismatch { .. } => CoreErrorKind::VersionMismatch,
            StorageError::OptimisticLock { .. } => CoreErrorKind::OptimisticLock,
            StorageError::AlreadyExists(_) => CoreErrorKind::AlreadyExists,
            StorageError::ChecksumMismatch { .. } => CoreErrorKind::ChecksumMismatch,
            StorageError::Serde(_) | StorageError::Io(_) => CoreErrorKind::NonRetryable,
            #[cfg(feature = "postgres")]
            StorageError::Database(_) => CoreErrorKind::Retryable,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
