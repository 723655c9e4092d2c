// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reports terminal node outcomes back into the Workflow Engine. Kept as a
//! trait (mirroring `linkflow_engine::effects`'s inversion) so this crate has
//! no compile-time dependency on a concrete `WorkflowEngine<...>`
//! instantiation — a daemon wires this to `complete_activity`/`fail_activity`.

use async_trait::async_trait;
use linkflow_core::ExecutionKey;
use serde_json::Value;

#[async_trait]
pub trait NodeOutcomeSink: Send + Sync {
    async fn complete(&self, key: &ExecutionKey, scheduled_event_id: i64, output: Value);

    /// Only called for terminal failures: non-retryable, or retryable with
    /// attempts exhausted (`FailOutcome::Exhausted`). A retryable failure
    /// that Matching re-enqueues never reaches this sink.
    async fn fail(&self, key: &ExecutionKey, scheduled_event_id: i64, message: String);
}
