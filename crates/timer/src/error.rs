// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use linkflow_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimerServiceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
