// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Visibility (listing) model (§3, §4.I).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NamespaceId, RunId, WorkflowId};
use crate::state::WorkflowStatus;

/// A denormalized row used for open/closed listing; not authoritative (that's
/// [`crate::state::MutableState`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRecord {
    pub namespace_id: NamespaceId,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub workflow_type: String,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub history_length: Option<i64>,
    pub memo: serde_json::Value,
}

impl VisibilityRecord {
    pub fn is_open(&self) -> bool {
        self.close_time.is_none()
    }
}

/// Opaque keyset pagination token: `RFC3339Nano "|" run_id` (§4.I).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
}

impl PageToken {
    pub fn encode(&self) -> String {
        format!("{}|{}", self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true), self.run_id)
    }

    pub fn decode(token: &str) -> Option<Self> {
        let (ts, run_id) = token.split_once('|')?;
        let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
        Some(Self { timestamp, run_id: RunId::from_string(run_id) })
    }
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
