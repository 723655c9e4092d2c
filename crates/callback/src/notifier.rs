// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback Notifier (§4.H): signs and delivers lifecycle notifications,
//! either synchronously (blocking the caller) or asynchronously via a
//! bounded queue drained by a single background task. A failed async
//! delivery is re-enqueued with delay `retry_delay * attempt` up to
//! `max_retries`; a full async queue falls back to a synchronous send.

use std::sync::Arc;
use std::time::Duration;

use serde_json::to_string as to_json_string;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::CallbackError;
use crate::payload::{sign, CallbackPayload};
use crate::transport::CallbackTransport;

#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// HMAC key; when `None`, requests are sent unsigned (§4.H: "if a shared
    /// secret is configured").
    pub callback_secret: Option<String>,
    /// Capacity of the async delivery queue. Default 100.
    pub queue_capacity: usize,
    /// Max redelivery attempts before an async item is dropped. Default 3.
    pub max_retries: u32,
    /// Base unit of the `retry_delay * attempt` backoff. Default 1s.
    pub retry_delay: Duration,
    /// Per-request HTTP timeout. Default 10s.
    pub request_timeout: Duration,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            callback_secret: None,
            queue_capacity: 100,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

struct QueueItem {
    payload: CallbackPayload,
    attempt: u32,
}

/// Builds the signed headers and body for `payload` and sends it through
/// `transport`.
async fn deliver<T: CallbackTransport + ?Sized>(
    transport: &T,
    url: &str,
    config: &CallbackConfig,
    payload: &CallbackPayload,
) -> Result<(), CallbackError> {
    let body = to_json_string(payload).map_err(|err| CallbackError::Serialize(err.to_string()))?;
    let timestamp = payload.timestamp.to_rfc3339();

    let mut headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("X-LinkFlow-Event".to_string(), payload.event.clone()),
        ("X-LinkFlow-Timestamp".to_string(), timestamp.clone()),
    ];
    if let Some(secret) = &config.callback_secret {
        headers.push(("X-LinkFlow-Signature".to_string(), sign(secret, &timestamp, &body)));
    }

    transport.send(url, headers, body).await
}

/// Owns the async delivery queue and its background drain task.
pub struct CallbackNotifier<T> {
    transport: Arc<T>,
    config: CallbackConfig,
    url: String,
    queue_tx: mpsc::Sender<QueueItem>,
}

impl<T: CallbackTransport + 'static> CallbackNotifier<T> {
    pub fn new(transport: Arc<T>, url: impl Into<String>, config: CallbackConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let notifier = Self { transport, config, url: url.into(), queue_tx };
        notifier.spawn_drain(queue_rx);
        notifier
    }

    fn spawn_drain(&self, mut queue_rx: mpsc::Receiver<QueueItem>) {
        let transport = self.transport.clone();
        let config = self.config.clone();
        let url = self.url.clone();
        let requeue_tx = self.queue_tx.clone();

        tokio::spawn(async move {
            while let Some(item) = queue_rx.recv().await {
                if let Err(err) = deliver(transport.as_ref(), &url, &config, &item.payload).await {
                    warn!(%err, event = %item.payload.event, attempt = item.attempt, "async callback delivery failed");
                    requeue_on_failure(&requeue_tx, &config, item);
                }
            }
        });
    }

    /// Blocks until delivery completes or fails; no retry is attempted.
    pub async fn notify_sync(&self, payload: CallbackPayload) -> Result<(), CallbackError> {
        deliver(self.transport.as_ref(), &self.url, &self.config, &payload).await
    }

    /// Enqueues `payload` for background delivery. Falls back to a blocking
    /// synchronous send if the queue is full (§4.H).
    pub async fn notify_async(&self, payload: CallbackPayload) {
        match self.queue_tx.try_send(QueueItem { payload: payload.clone(), attempt: 1 }) {
            Ok(()) => {}
            Err(_) => {
                warn!(event = %payload.event, "async callback queue full, falling back to synchronous send");
                if let Err(err) = self.notify_sync(payload).await {
                    warn!(%err, "synchronous callback fallback also failed");
                }
            }
        }
    }
}

/// Schedules a delayed requeue of a failed async item, unless its attempts
/// are exhausted. The delay sleep runs in its own task so the drain loop
/// keeps processing other items in the meantime.
fn requeue_on_failure(queue_tx: &mpsc::Sender<QueueItem>, config: &CallbackConfig, item: QueueItem) {
    if item.attempt >= config.max_retries {
        warn!(event = %item.payload.event, attempts = item.attempt, "async callback delivery exhausted retries, dropping");
        return;
    }

    let delay = config.retry_delay * item.attempt;
    let next = QueueItem { payload: item.payload, attempt: item.attempt + 1 };
    let queue_tx = queue_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if queue_tx.try_send(next).is_err() {
            warn!("async callback retry queue full, dropping redelivery");
        }
    });
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
