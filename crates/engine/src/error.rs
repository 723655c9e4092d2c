// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use linkflow_storage::StorageError;
use linkflow_workflow::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow definition invalid: {0}")]
    InvalidWorkflow(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The decision batch lost the optimistic-concurrency race; the caller
    /// should re-read current state and retry (§4.F: "the batch is
    /// discarded and re-derived from a fresh read").
    #[error("decision batch lost the optimistic concurrency race")]
    Conflict,
    #[error("execution is already in a terminal state")]
    AlreadyTerminal,
    #[error("no pending activity for scheduled_event_id {0}")]
    UnknownActivity(i64),
    #[error("no pending timer {0}")]
    UnknownTimer(String),
}

impl EngineError {
    /// True when the conflict stems from the optimistic-lock race rather
    /// than a structural problem, i.e. safe to retry with a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict
                | EngineError::Storage(StorageError::OptimisticLock { .. })
                | EngineError::Storage(StorageError::VersionMismatch { .. })
        )
    }
}
