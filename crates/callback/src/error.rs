// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, Clone, thiserror::Error)]
pub enum CallbackError {
    #[error("callback payload serialization failed: {0}")]
    Serialize(String),
    #[error("callback transport error: {0}")]
    Transport(String),
    #[error("non-2xx response ({status}): {body}")]
    NonSuccessStatus { status: u16, body: String },
}
