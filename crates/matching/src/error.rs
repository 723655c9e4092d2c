// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchingError {
    #[error("task queue is at capacity")]
    QueueFull,
    #[error("rate limited")]
    RateLimited,
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("lease token does not match current lease for task {0}")]
    LeaseMismatch(String),
}
