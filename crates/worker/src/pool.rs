// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Pool (§4.G): each worker loop polls Matching under a host-level
//! bulkhead, resolves an executor by `node_type`, runs it under a
//! per-executor circuit breaker and a hard timeout, then reports the outcome
//! back to Matching (lease release) and, for terminal outcomes, to the
//! engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use linkflow_core::{CoreErrorKind, NamespaceId, Task, TaskQueueName};
use linkflow_engine::VariableSource;
use linkflow_engine::VariableResolver;
use linkflow_matching::{FailOutcome, MatchingService};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::bulkhead::Bulkhead;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitOpenError};
use crate::executor::{node_type_of, CredentialSource, ExecutionContext, ExecutorError, ExecutorRegistry};
use crate::interpolate::interpolate_json;
use crate::outcome::NodeOutcomeSink;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub namespace: String,
    pub task_queue: TaskQueueName,
    pub worker_count: usize,
    /// Host-level bulkhead: bounded concurrent executions across all workers
    /// in this pool.
    pub bulkhead_capacity: usize,
    pub bulkhead_max_wait: Duration,
    pub execute_timeout: Duration,
    pub breaker: CircuitBreakerConfig,
    /// How long a worker sleeps after an empty poll before trying again.
    pub empty_poll_backoff: Duration,
}

impl WorkerConfig {
    pub fn new(namespace: impl Into<String>, task_queue: TaskQueueName) -> Self {
        Self {
            namespace: namespace.into(),
            task_queue,
            worker_count: 4,
            bulkhead_capacity: 16,
            bulkhead_max_wait: Duration::from_secs(1),
            execute_timeout: Duration::from_secs(30),
            breaker: CircuitBreakerConfig::default(),
            empty_poll_backoff: Duration::from_millis(200),
        }
    }
}

/// Double-checked lazy registry of per-executor circuit breakers, mirroring
/// the shared-resource policy used by `linkflow-matching`'s rate limiter
/// (§4.G: "a single reader/writer lock each, with double-checked lazy
/// insertion").
#[derive(Default)]
struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    fn get_or_create(&self, node_type: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(node_type) {
            return existing.clone();
        }
        let mut breakers = self.breakers.write();
        breakers.entry(node_type.to_string()).or_insert_with(|| Arc::new(CircuitBreaker::new(config))).clone()
    }
}

/// Outcome of a single poll-execute cycle, for tests and observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was queued to poll.
    Empty,
    /// The host bulkhead had no capacity within its max wait.
    BulkheadRejected,
    /// The task's `node_type` had no registered executor.
    ExecutorNotFound,
    Completed,
    /// Failed, re-enqueued by Matching for retry.
    Retried,
    /// Failed, attempts exhausted or non-retryable; reported to the engine.
    FailedTerminal,
}

pub struct WorkerPool<V> {
    matching: Arc<MatchingService>,
    registry: Arc<ExecutorRegistry>,
    resolver: Arc<VariableResolver<V>>,
    credentials: Arc<dyn CredentialSource>,
    outcomes: Arc<dyn NodeOutcomeSink>,
    bulkhead: Bulkhead,
    breakers: CircuitBreakerRegistry,
    config: WorkerConfig,
}

impl<V: VariableSource> WorkerPool<V> {
    pub fn new(
        matching: Arc<MatchingService>,
        registry: Arc<ExecutorRegistry>,
        resolver: Arc<VariableResolver<V>>,
        credentials: Arc<dyn CredentialSource>,
        outcomes: Arc<dyn NodeOutcomeSink>,
        config: WorkerConfig,
    ) -> Self {
        let bulkhead = Bulkhead::new(config.bulkhead_capacity, config.bulkhead_max_wait);
        Self {
            matching,
            registry,
            resolver,
            credentials,
            outcomes,
            bulkhead,
            breakers: CircuitBreakerRegistry::default(),
            config,
        }
    }

    /// Spawns `worker_count` independent polling loops. Each loop runs until
    /// the returned handles are aborted or the process exits.
    pub fn spawn(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>>
    where
        V: 'static,
    {
        (0..self.config.worker_count)
            .map(|idx| {
                let pool = self.clone();
                let worker_id = format!("worker-{idx}");
                tokio::spawn(async move { pool.run(worker_id).await })
            })
            .collect()
    }

    async fn run(&self, worker_id: String) {
        loop {
            match self.run_once(&worker_id).await {
                CycleOutcome::Empty | CycleOutcome::BulkheadRejected => {
                    tokio::time::sleep(self.config.empty_poll_backoff).await
                }
                CycleOutcome::ExecutorNotFound
                | CycleOutcome::Completed
                | CycleOutcome::Retried
                | CycleOutcome::FailedTerminal => {}
            }
        }
    }

    /// One poll-execute-report cycle. Exposed directly for tests so the pool
    /// doesn't need to be driven through an infinite loop.
    pub async fn run_once(&self, worker_id: &str) -> CycleOutcome {
        let permit = match self.bulkhead.acquire().await {
            Ok(permit) => permit,
            Err(_) => return CycleOutcome::BulkheadRejected,
        };

        let namespace = NamespaceId::new(&self.config.namespace);
        let polled = match self.matching.poll_one(&self.config.namespace, &self.config.task_queue, worker_id) {
            Ok(Some(polled)) => polled,
            Ok(None) => return CycleOutcome::Empty,
            Err(err) => {
                warn!(%err, "poll_one failed");
                return CycleOutcome::Empty;
            }
        };
        // held for the duration of this execution, releasing bulkhead
        // capacity only once the attempt (success or failure) is reported.
        let _permit = permit;

        let task = polled.task;
        let lease_token = polled.lease_token;

        let Some(scheduled_event_id) = task.scheduled_event_id() else {
            warn!(task_id = %task.task_id, "task_id did not carry a recoverable scheduled_event_id");
            return CycleOutcome::ExecutorNotFound;
        };

        let config = interpolate_json(&self.resolver, &namespace, &task.payload).await;
        let Some(node_type) = node_type_of(&config).map(str::to_string) else {
            self.report_unroutable(&task, &lease_token, scheduled_event_id).await;
            return CycleOutcome::ExecutorNotFound;
        };

        let Some(executor) = self.registry.get(&node_type) else {
            self.report_unroutable(&task, &lease_token, scheduled_event_id).await;
            return CycleOutcome::ExecutorNotFound;
        };

        let credentials = self.credentials.resolve(&task.execution_key, &task.node_id).await;
        let ctx = ExecutionContext {
            execution_key: task.execution_key.clone(),
            node_id: task.node_id.clone(),
            node_type: node_type.clone(),
            config,
            upstream_inputs: HashMap::new(),
            credentials,
            attempt: task.attempts,
        };

        let breaker = self.breakers.get_or_create(&node_type, self.config.breaker);
        let timeout = self.config.execute_timeout;
        let result = breaker
            .call(|| async move {
                tokio::time::timeout(timeout, executor.execute(ctx)).await.map_err(|_| {
                    ExecutorError { kind: CoreErrorKind::Timeout, message: "execution timed out".to_string() }
                })?
            })
            .await;

        match result {
            Ok(output) => {
                if let Err(err) = self.matching.complete(&self.config.namespace, &self.config.task_queue, &task.task_id, &lease_token) {
                    warn!(%err, task_id = %task.task_id, "complete() failed after successful execution");
                }
                self.outcomes.complete(&task.execution_key, scheduled_event_id, output).await;
                CycleOutcome::Completed
            }
            Err(Ok(exec_err)) => self.report_failure(&task, &lease_token, scheduled_event_id, exec_err.kind, exec_err.message).await,
            Err(Err(CircuitOpenError)) => {
                info!(node_type = %node_type, "circuit open, short-circuiting execution");
                self.report_failure(
                    &task,
                    &lease_token,
                    scheduled_event_id,
                    CoreErrorKind::CircuitOpen,
                    format!("circuit open for node_type {node_type}"),
                )
                .await
            }
        }
    }

    async fn report_unroutable(&self, task: &Task, lease_token: &str, scheduled_event_id: i64) {
        self.report_failure(
            task,
            lease_token,
            scheduled_event_id,
            CoreErrorKind::ExecutorNotFound,
            format!("no executor registered for node {}", task.node_id),
        )
        .await;
    }

    async fn report_failure(
        &self,
        task: &Task,
        lease_token: &str,
        scheduled_event_id: i64,
        kind: CoreErrorKind,
        message: String,
    ) -> CycleOutcome {
        let fail_result = self.matching.fail(&self.config.namespace, &self.config.task_queue, &task.task_id, lease_token, kind);
        match fail_result {
            Ok(FailOutcome::Requeued) => CycleOutcome::Retried,
            Ok(FailOutcome::Exhausted) | Err(_) => {
                self.outcomes.fail(&task.execution_key, scheduled_event_id, message).await;
                CycleOutcome::FailedTerminal
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
