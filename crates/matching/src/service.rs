// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use linkflow_core::{backoff_for_attempt, CoreErrorKind, Task, TaskQueueName};
use parking_lot::Mutex;
use rand::RngCore;
use tracing::{info, warn};

use crate::error::MatchingError;
use crate::queue::TaskQueue;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

/// Default bound on a `(namespace, task_queue)` queue (§4.D).
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// A task handed out by [`MatchingService::poll_one`], carrying the lease
/// token the worker must present back to `Complete`/`Fail`/`ExtendLease`.
#[derive(Debug, Clone)]
pub struct PolledTask {
    pub task: Task,
    pub lease_token: String,
}

/// Outcome of a `Fail` call (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Re-enqueued with `visible_at = now + backoff(attempts)`.
    Requeued,
    /// `attempts >= max_attempts`; the task is dropped from the queue.
    Exhausted,
}

fn generate_lease_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory priority task queue service for a single process (§4.D).
pub struct MatchingService {
    queues: Mutex<HashMap<(String, TaskQueueName), TaskQueue>>,
    capacity: usize,
    rate_limiter: RateLimiter,
}

impl MatchingService {
    pub fn new(rate_limiter: RateLimiter) -> Self {
        Self { queues: Mutex::new(HashMap::new()), capacity: DEFAULT_QUEUE_CAPACITY, rate_limiter }
    }

    pub fn with_capacity(rate_limiter: RateLimiter, capacity: usize) -> Self {
        Self { queues: Mutex::new(HashMap::new()), capacity, rate_limiter }
    }

    pub fn set_namespace_rate_limit(&self, namespace: &str, config: RateLimitConfig) {
        self.rate_limiter.set_namespace_limit(namespace, config);
    }

    pub fn remove_namespace_rate_limit(&self, namespace: &str) {
        self.rate_limiter.remove_namespace_limit(namespace);
    }

    /// `scheduled_at` defaults to now if zero (treated as unset); `visible_at`
    /// defaults to `scheduled_at` (§4.D).
    pub fn enqueue(&self, mut task: Task) -> Result<(), MatchingError> {
        if !self.rate_limiter.check_and_consume(&task.namespace) {
            return Err(MatchingError::RateLimited);
        }

        let now = Utc::now();
        if task.scheduled_at.timestamp() == 0 {
            task.scheduled_at = now;
            task.visible_at = now;
        }

        let key = (task.namespace.clone(), task.task_queue.clone());
        let mut queues = self.queues.lock();
        let queue = queues.entry(key).or_insert_with(|| TaskQueue::new(self.capacity));
        if queue.push(task) {
            Ok(())
        } else {
            Err(MatchingError::QueueFull)
        }
    }

    pub fn poll_one(
        &self,
        namespace: &str,
        task_queue: &TaskQueueName,
        worker_id: &str,
    ) -> Result<Option<PolledTask>, MatchingError> {
        if !self.rate_limiter.check_and_consume(namespace) {
            return Err(MatchingError::RateLimited);
        }

        let now = Utc::now();
        let key = (namespace.to_string(), task_queue.clone());
        let mut queues = self.queues.lock();
        let Some(queue) = queues.get_mut(&key) else {
            return Ok(None);
        };

        let Some(queued) = queue.poll(now) else {
            return Ok(None);
        };

        queued.task.attempts += 1;
        let lease_token = generate_lease_token();
        queued.lease_token = Some(lease_token.clone());
        queued.lease_expires_at = Some(now + chrono::Duration::from_std(queued.task.timeout).unwrap_or_default());

        info!(task_id = %queued.task.task_id, %worker_id, "task leased");
        Ok(Some(PolledTask { task: queued.task.clone(), lease_token }))
    }

    pub fn complete(&self, namespace: &str, task_queue: &TaskQueueName, task_id: &str, lease_token: &str) -> Result<(), MatchingError> {
        let key = (namespace.to_string(), task_queue.clone());
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&key).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;
        let queued = queue.find_mut(task_id).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;

        if queued.lease_token.as_deref() != Some(lease_token) {
            return Err(MatchingError::LeaseMismatch(task_id.to_string()));
        }

        queue.remove(task_id);
        Ok(())
    }

    pub fn fail(
        &self,
        namespace: &str,
        task_queue: &TaskQueueName,
        task_id: &str,
        lease_token: &str,
        error_kind: CoreErrorKind,
    ) -> Result<FailOutcome, MatchingError> {
        let key = (namespace.to_string(), task_queue.clone());
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&key).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;
        let queued = queue.find_mut(task_id).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;

        if queued.lease_token.as_deref() != Some(lease_token) {
            return Err(MatchingError::LeaseMismatch(task_id.to_string()));
        }

        if !error_kind.is_retryable() || queued.task.is_exhausted() {
            let attempts = queued.task.attempts;
            queue.remove(task_id);
            warn!(task_id, attempts, "task exhausted, not re-enqueued");
            return Ok(FailOutcome::Exhausted);
        }

        let backoff = backoff_for_attempt(queued.task.attempts);
        queued.task.visible_at = Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default();
        queued.lease_token = None;
        queued.lease_expires_at = None;

        Ok(FailOutcome::Requeued)
    }

    pub fn extend_lease(
        &self,
        namespace: &str,
        task_queue: &TaskQueueName,
        task_id: &str,
        lease_token: &str,
        extra: Duration,
    ) -> Result<(), MatchingError> {
        let key = (namespace.to_string(), task_queue.clone());
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&key).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;
        let queued = queue.find_mut(task_id).ok_or_else(|| MatchingError::TaskNotFound(task_id.to_string()))?;

        if queued.lease_token.as_deref() != Some(lease_token) {
            return Err(MatchingError::LeaseMismatch(task_id.to_string()));
        }

        let base = queued.lease_expires_at.unwrap_or_else(Utc::now);
        queued.lease_expires_at = Some(base + chrono::Duration::from_std(extra).unwrap_or_default());
        Ok(())
    }

    pub fn queue_len(&self, namespace: &str, task_queue: &TaskQueueName) -> usize {
        self.queues.lock().get(&(namespace.to_string(), task_queue.clone())).map(TaskQueue::len).unwrap_or(0)
    }
}

impl Default for MatchingService {
    fn default() -> Self {
        Self::new(RateLimiter::default())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
