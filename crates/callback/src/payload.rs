// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback payload shape and HMAC signing (§4.H).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use linkflow_core::{ExecutionKey, HistoryEventType};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;

/// Lifecycle notification sent to the control plane.
///
/// `workflow_id` and `execution_id` both carry [`ExecutionKey::workflow_id`]:
/// the key has no separate "workflow type" field, so the two payload names
/// are synonyms for the same caller-chosen identity rather than distinct
/// values (see DESIGN.md).
#[derive(Debug, Clone, Serialize)]
pub struct CallbackPayload {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub workspace_id: String,
    pub workflow_id: String,
    pub execution_id: String,
    pub run_id: String,
    pub data: Value,
}

impl CallbackPayload {
    pub fn new(event: impl Into<String>, key: &ExecutionKey, timestamp: DateTime<Utc>, data: Value) -> Self {
        Self {
            event: event.into(),
            timestamp,
            workspace_id: key.namespace_id.to_string(),
            workflow_id: key.workflow_id.to_string(),
            execution_id: key.workflow_id.to_string(),
            run_id: key.run_id.to_string(),
            data,
        }
    }
}

/// Maps an internal history event type to the external dotted event name
/// (§4.H). Event types with no externally-notified counterpart (scheduling
/// and timer bookkeeping events) return `None`.
pub fn event_name(event_type: HistoryEventType) -> Option<&'static str> {
    use HistoryEventType::*;
    match event_type {
        WorkflowStarted => Some("execution.started"),
        WorkflowCompleted => Some("execution.completed"),
        WorkflowFailed => Some("execution.failed"),
        WorkflowCanceled => Some("execution.canceled"),
        ActivityStarted => Some("node.started"),
        ActivityCompleted => Some("node.completed"),
        ActivityFailed | ActivityTimedOut => Some("node.failed"),
        ActivityScheduled | TimerStarted | TimerFired | TimerCanceled | SignalReceived | ContinueAsNew => None,
    }
}

/// `hex(HMAC-SHA256(secret, timestamp + "." + body))` (§4.H). `Hmac<Sha256>`
/// accepts keys of any length, so construction cannot fail in practice; an
/// empty signature is returned rather than panicking if it ever did.
pub fn sign(secret: &str, timestamp: &str, body: &str) -> String {
    match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(body.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
