// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side-effect sinks the engine schedules into after a decision batch
//! commits (§4.F): dispatching activities to Matching, starting/canceling
//! durable timers, and notifying the control plane. Kept as traits so this
//! crate has no compile-time dependency on `linkflow-matching` or
//! `linkflow-callback`; a daemon wires in concrete adapters over those
//! crates' services.

use async_trait::async_trait;
use linkflow_core::{ExecutionKey, HistoryEventType, Task, Timer, TimerId};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("scheduling failed: {0}")]
pub struct SchedulingError(pub String);

/// Dispatches a node as a task into Matching (§4.D).
#[async_trait]
pub trait ActivityScheduler: Send + Sync {
    async fn schedule(&self, task: Task) -> Result<(), SchedulingError>;
}

/// Starts or cancels a durable timer (§4.C).
#[async_trait]
pub trait TimerScheduler: Send + Sync {
    async fn start(&self, timer: Timer) -> Result<(), SchedulingError>;

    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId) -> Result<(), SchedulingError>;
}

/// Fire-and-forget notification to the control plane (§4.H); the callback
/// notifier owns its own retry policy, so the engine never blocks a
/// decision batch on delivery.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn notify(&self, key: &ExecutionKey, event_type: HistoryEventType, payload: serde_json::Value);
}

/// A [`CallbackSink`] that drops every notification; useful where no
/// callback URL was configured for an execution.
pub struct NoopCallbackSink;

#[async_trait]
impl CallbackSink for NoopCallbackSink {
    async fn notify(&self, _key: &ExecutionKey, _event_type: HistoryEventType, _payload: serde_json::Value) {}
}
