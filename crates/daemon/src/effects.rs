// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete adapters wiring `linkflow-engine`'s side-effect traits onto
//! `linkflow-matching`, `linkflow-storage`'s [`TimerStore`], and
//! `linkflow-callback`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use linkflow_callback::{event_name, CallbackNotifier, CallbackPayload, CallbackTransport};
use linkflow_core::{ExecutionKey, HistoryEventType, Task, Timer, TimerId};
use linkflow_engine::{ActivityScheduler, CallbackSink, SchedulingError, TimerScheduler};
use linkflow_matching::MatchingService;
use linkflow_storage::TimerStore;

/// Dispatches activities into the shared [`MatchingService`].
pub struct MatchingActivityScheduler {
    matching: Arc<MatchingService>,
}

impl MatchingActivityScheduler {
    pub fn new(matching: Arc<MatchingService>) -> Self {
        Self { matching }
    }
}

#[async_trait]
impl ActivityScheduler for MatchingActivityScheduler {
    async fn schedule(&self, task: Task) -> Result<(), SchedulingError> {
        self.matching.enqueue(task).map_err(|err| SchedulingError(err.to_string()))
    }
}

/// Starts and cancels durable timers against a shard's [`TimerStore`].
pub struct StoreTimerScheduler<S> {
    store: Arc<S>,
}

impl<S: TimerStore> StoreTimerScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: TimerStore> TimerScheduler for StoreTimerScheduler<S> {
    async fn start(&self, timer: Timer) -> Result<(), SchedulingError> {
        self.store.insert(timer).await.map_err(|err| SchedulingError(err.to_string()))
    }

    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId) -> Result<(), SchedulingError> {
        self.store.cancel(key, timer_id, Utc::now()).await.map_err(|err| SchedulingError(err.to_string()))
    }
}

/// Forwards workflow-closure events to the control plane via a
/// [`CallbackNotifier`], skipping event types with no external name (§4.H).
pub struct NotifierCallbackSink<T: CallbackTransport> {
    notifier: Arc<CallbackNotifier<T>>,
}

impl<T: CallbackTransport> NotifierCallbackSink<T> {
    pub fn new(notifier: Arc<CallbackNotifier<T>>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl<T: CallbackTransport + 'static> CallbackSink for NotifierCallbackSink<T> {
    async fn notify(&self, key: &ExecutionKey, event_type: HistoryEventType, payload: serde_json::Value) {
        let Some(name) = event_name(event_type) else {
            return;
        };
        let callback_payload = CallbackPayload::new(name, key, Utc::now(), payload);
        self.notifier.notify_async(callback_payload).await;
    }
}

#[cfg(test)]
#[path = "effects_tests.rs"]
mod tests;
