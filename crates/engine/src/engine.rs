// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Workflow Engine state machine (§4.F): the brain that turns a
//! `StartWorkflow` call, a worker's task report, a timer fire, or a signal
//! into a decision batch — new events + an updated `MutableState` — and,
//! once both persist, the external side effects that follow from it.
//!
//! The engine is single-threaded per `ExecutionKey` only in the sense that
//! concurrent callers serialize through the `MutableStateStore`'s optimistic
//! lock; nothing here prevents two callers from racing, a lost race just
//! comes back as [`EngineError::Conflict`] for the caller to retry against a
//! fresh read.
//!
//! The workflow definition itself is not a separate persisted entity (§6's
//! persisted-state layout has no table for it): it is embedded verbatim in
//! the `WorkflowStarted` event's payload and read back from history on every
//! subsequent decision, the same way replay reconstructs any other piece of
//! derived state from the log.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkflow_core::{
    ActivityInfo, ExecutionKey, HistoryEvent, HistoryEventType, NamespaceId, NodeResult, Priority,
    RunId, Task, Timer, TimerId, TimerInfo, TimerStatus, VisibilityRecord, WorkflowId,
    WorkflowStatus,
};
use linkflow_storage::{EventStore, MutableStateStore, StorageError, VisibilityStore};
use linkflow_timer::{DeliveryError, TimerDeliverer};
use linkflow_workflow::{NodeType, WorkflowDefinition};
use parking_lot::Mutex;
use serde_json::json;
use tracing::warn;

use crate::effects::{ActivityScheduler, CallbackSink, SchedulingError, TimerScheduler};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub shard_count: u32,
    pub default_activity_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { shard_count: 16, default_activity_timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    pub started: bool,
}

/// A pending set of history events + the resulting state, not yet durable.
struct DecisionBatch {
    exec_key: ExecutionKey,
    events: Vec<HistoryEvent>,
    next_event_id: i64,
    state: linkflow_core::MutableState,
    activities: Vec<Task>,
    timers: Vec<Timer>,
    timer_cancellations: Vec<TimerId>,
    callback: Option<(HistoryEventType, serde_json::Value)>,
    visibility_started: Option<VisibilityRecord>,
    visibility_closed: Option<(DateTime<Utc>, WorkflowStatus)>,
}

impl DecisionBatch {
    fn new(exec_key: ExecutionKey, state: linkflow_core::MutableState) -> Self {
        let next_event_id = state.next_event_id;
        Self {
            exec_key,
            events: Vec::new(),
            next_event_id,
            state,
            activities: Vec::new(),
            timers: Vec::new(),
            timer_cancellations: Vec::new(),
            callback: None,
            visibility_started: None,
            visibility_closed: None,
        }
    }

    fn push_event(&mut self, event_type: HistoryEventType, now: DateTime<Utc>, payload: serde_json::Value) -> i64 {
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        let version = self.state.db_version + 1;
        self.events.push(HistoryEvent::new(event_id, event_type, version, now, payload));
        self.state.next_event_id = self.next_event_id;
        event_id
    }
}

/// Drives one execution's state machine, generic over the storage
/// contracts and the external side-effect sinks it schedules into.
pub struct WorkflowEngine<EV, ST, VZ, AS, TS, CS> {
    events: Arc<EV>,
    state: Arc<ST>,
    visibility: Arc<VZ>,
    activities: Arc<AS>,
    timers: Arc<TS>,
    callbacks: Arc<CS>,
    config: EngineConfig,
    idempotency: Mutex<HashMap<(String, String, String), RunId>>,
}

impl<EV, ST, VZ, AS, TS, CS> WorkflowEngine<EV, ST, VZ, AS, TS, CS>
where
    EV: EventStore,
    ST: MutableStateStore,
    VZ: VisibilityStore,
    AS: ActivityScheduler,
    TS: TimerScheduler,
    CS: CallbackSink,
{
    pub fn new(
        events: Arc<EV>,
        state: Arc<ST>,
        visibility: Arc<VZ>,
        activities: Arc<AS>,
        timers: Arc<TS>,
        callbacks: Arc<CS>,
        config: EngineConfig,
    ) -> Self {
        Self {
            events,
            state,
            visibility,
            activities,
            timers,
            callbacks,
            config,
            idempotency: Mutex::new(HashMap::new()),
        }
    }

    /// §4.F.1. Idempotent on `(namespace_id, workflow_id, idempotency_key)`:
    /// a repeat returns the prior `run_id` with `started = false`.
    pub async fn start_workflow(
        &self,
        namespace_id: NamespaceId,
        workflow_id: WorkflowId,
        workflow_type: String,
        def: WorkflowDefinition,
        input: serde_json::Value,
        idempotency_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(RunId, StartOutcome), EngineError> {
        def.validate()?;

        let idem_key = (namespace_id.to_string(), workflow_id.to_string(), idempotency_key.unwrap_or_default());
        if let Some(existing) = self.idempotency.lock().get(&idem_key).cloned() {
            return Ok((existing, StartOutcome { started: false }));
        }

        let run_id = RunId::new();
        let key = ExecutionKey::new(namespace_id, workflow_id, run_id.clone());
        let state = linkflow_core::MutableState::initial(now, input.clone());
        let mut batch = DecisionBatch::new(key.clone(), state);

        // `MutableState::initial` already reserves event_id 1 for this event
        // (next_event_id starts at 2), so it is appended directly rather
        // than through `push_event`, which would assign id 2 instead.
        let def_json = serde_json::to_value(&def).map_err(StorageError::from)?;
        batch.events.push(HistoryEvent::new(
            1,
            HistoryEventType::WorkflowStarted,
            1,
            now,
            json!({ "workflow_type": workflow_type, "input": input, "workflow_def": def_json }),
        ));

        batch.visibility_started = Some(VisibilityRecord {
            namespace_id: key.namespace_id.clone(),
            workflow_id: key.workflow_id.clone(),
            run_id: key.run_id.clone(),
            workflow_type,
            start_time: now,
            close_time: None,
            status: WorkflowStatus::Running,
            history_length: None,
            memo: json!({}),
        });

        for root in def.root_nodes() {
            self.schedule_node(&def, &mut batch, root, now);
        }

        self.commit(&key, batch, 0, 0).await?;
        self.idempotency.lock().insert(idem_key, run_id.clone());
        Ok((run_id, StartOutcome { started: true }))
    }

    /// §4.F.2, success path.
    pub async fn complete_activity(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: i64,
        output: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let state = self.state.get(key).await?;
        if state.is_terminal() {
            return Err(EngineError::AlreadyTerminal);
        }
        let old_db_version = state.db_version;
        let expected_event_version = state.next_event_id - 1;
        let def = self.load_definition(key).await?;

        let mut batch = DecisionBatch::new(key.clone(), state);
        let info = batch
            .state
            .pending_activities
            .remove(&scheduled_event_id)
            .ok_or(EngineError::UnknownActivity(scheduled_event_id))?;

        batch.push_event(
            HistoryEventType::ActivityCompleted,
            now,
            json!({ "node_id": info.node_id, "output": output }),
        );

        self.complete_node(&def, &mut batch, &info.node_id, output, now);
        self.commit(key, batch, expected_event_version, old_db_version).await
    }

    /// §4.F.2, terminal-failure path. Only called once the worker pool has
    /// already determined the failure is non-retryable or attempts are
    /// exhausted — retryable redelivery is handled entirely within Matching.
    pub async fn fail_activity(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: i64,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let state = self.state.get(key).await?;
        if state.is_terminal() {
            return Err(EngineError::AlreadyTerminal);
        }
        let old_db_version = state.db_version;
        let expected_event_version = state.next_event_id - 1;
        let def = self.load_definition(key).await?;

        let mut batch = DecisionBatch::new(key.clone(), state);
        let info = batch
            .state
            .pending_activities
            .remove(&scheduled_event_id)
            .ok_or(EngineError::UnknownActivity(scheduled_event_id))?;

        batch.push_event(
            HistoryEventType::ActivityFailed,
            now,
            json!({ "node_id": info.node_id, "error": error_message }),
        );
        batch.state.failed_node_id = Some(info.node_id.clone());

        if let Some(error_edge) = def.error_edge(&info.node_id).cloned() {
            self.schedule_node(&def, &mut batch, &error_edge.to, now);
        } else {
            self.close_workflow(&mut batch, WorkflowStatus::Failed, now);
        }

        self.commit(key, batch, expected_event_version, old_db_version).await
    }

    /// §4.F.3: resumes a waiting node if its key matches, otherwise buffers
    /// the event for replay.
    pub async fn receive_signal(
        &self,
        key: &ExecutionKey,
        signal_name: &str,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let state = self.state.get(key).await?;
        if state.is_terminal() {
            return Err(EngineError::AlreadyTerminal);
        }
        let old_db_version = state.db_version;
        let expected_event_version = state.next_event_id - 1;
        let def = self.load_definition(key).await?;

        let mut batch = DecisionBatch::new(key.clone(), state);
        let waiting = batch
            .state
            .pending_activities
            .iter()
            .find(|(_, info)| info.task_type == wait_task_type(signal_name))
            .map(|(id, info)| (*id, info.node_id.clone()));

        batch.push_event(HistoryEventType::SignalReceived, now, json!({ "signal_name": signal_name, "data": data }));

        match waiting {
            Some((scheduled_event_id, node_id)) => {
                batch.state.pending_activities.remove(&scheduled_event_id);
                self.complete_node(&def, &mut batch, &node_id, data, now);
            }
            None => {
                let event = batch.events.last().cloned().expect("just pushed");
                batch.state.buffered_events.push(event);
            }
        }

        self.commit(key, batch, expected_event_version, old_db_version).await
    }

    /// §4.F: cancels a non-terminal run, canceling any outstanding timers.
    pub async fn cancel_workflow(
        &self,
        key: &ExecutionKey,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let state = self.state.get(key).await?;
        if state.is_terminal() {
            return Err(EngineError::AlreadyTerminal);
        }
        let old_db_version = state.db_version;
        let expected_event_version = state.next_event_id - 1;

        let mut batch = DecisionBatch::new(key.clone(), state);
        batch.push_event(HistoryEventType::WorkflowCanceled, now, json!({ "reason": reason }));
        batch.timer_cancellations = batch.state.pending_timers.keys().map(|id| TimerId::from_string(id)).collect();
        self.close_workflow(&mut batch, WorkflowStatus::Canceled, now);

        self.commit(key, batch, expected_event_version, old_db_version).await
    }

    fn complete_node(
        &self,
        def: &WorkflowDefinition,
        batch: &mut DecisionBatch,
        node_id: &str,
        output: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        batch
            .state
            .completed_nodes
            .insert(node_id.to_string(), NodeResult { node_id: node_id.to_string(), output, completed_at: now });

        let completed_outputs: HashMap<String, serde_json::Value> =
            batch.state.completed_nodes.iter().map(|(k, v)| (k.clone(), v.output.clone())).collect();

        let targets: Vec<String> =
            def.outgoing_edges(node_id).filter(|e| !e.error_edge).map(|e| e.to.clone()).collect();

        for target in targets {
            if node_already_active(&batch.state, &target) {
                continue;
            }
            if def.join_satisfied(&target, &completed_outputs) {
                self.schedule_node(def, batch, &target, now);
            }
        }

        if workflow_is_complete(def, &batch.state) {
            self.close_workflow(batch, WorkflowStatus::Completed, now);
        }
    }

    fn schedule_node(&self, def: &WorkflowDefinition, batch: &mut DecisionBatch, node_id: &str, now: DateTime<Utc>) {
        let Some(node) = def.node(node_id) else {
            warn!(node_id, "fan-out target missing from workflow definition");
            return;
        };

        match node.node_type.clone() {
            NodeType::Activity { task_queue, node_config } => {
                let event_id = batch.push_event(
                    HistoryEventType::ActivityScheduled,
                    now,
                    json!({ "node_id": node_id, "task_queue": task_queue.as_str() }),
                );
                batch.state.pending_activities.insert(
                    event_id,
                    ActivityInfo {
                        node_id: node_id.to_string(),
                        task_type: "activity".to_string(),
                        scheduled_event_id: event_id,
                        scheduled_at: now,
                        attempts: 0,
                        max_attempts: node.max_attempts,
                    },
                );
                batch.activities.push(Task {
                    task_id: Task::deterministic_id(
                        batch.exec_key.namespace_id.as_str(),
                        batch.exec_key.workflow_id.as_str(),
                        batch.exec_key.run_id.as_str(),
                        "activity",
                        event_id,
                    ),
                    namespace: batch.exec_key.namespace_id.to_string(),
                    task_queue,
                    execution_key: batch.exec_key.clone(),
                    node_id: node_id.to_string(),
                    task_type: "activity".to_string(),
                    priority: Priority::NORMAL,
                    payload: node_config,
                    scheduled_at: now,
                    visible_at: now,
                    attempts: 0,
                    max_attempts: node.max_attempts,
                    timeout: self.config.default_activity_timeout,
                });
            }
            NodeType::Delay { duration } => {
                let fire_time = now + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
                let timer_id_value = format!("{node_id}:{}", batch.next_event_id);
                let timer_id = TimerId::from_string(&timer_id_value);
                batch.push_event(
                    HistoryEventType::TimerStarted,
                    now,
                    json!({ "node_id": node_id, "timer_id": timer_id_value, "fire_time": fire_time }),
                );
                batch.state.pending_timers.insert(
                    timer_id_value,
                    TimerInfo { timer_id: timer_id.clone(), fire_time, blocked_node_id: node_id.to_string() },
                );
                batch.timers.push(Timer {
                    shard_id: batch.exec_key.shard_id(self.config.shard_count),
                    namespace_id: batch.exec_key.namespace_id.clone(),
                    workflow_id: batch.exec_key.workflow_id.clone(),
                    run_id: batch.exec_key.run_id.clone(),
                    timer_id,
                    fire_time,
                    status: TimerStatus::Pending,
                    version: 0,
                    created_at: now,
                    fired_at: None,
                });
            }
            NodeType::Wait { signal_name } => {
                let event_id = batch.push_event(
                    HistoryEventType::ActivityScheduled,
                    now,
                    json!({ "node_id": node_id, "wait_signal": signal_name }),
                );
                batch.state.pending_activities.insert(
                    event_id,
                    ActivityInfo {
                        node_id: node_id.to_string(),
                        task_type: wait_task_type(&signal_name),
                        scheduled_event_id: event_id,
                        scheduled_at: now,
                        attempts: 0,
                        max_attempts: node.max_attempts,
                    },
                );
            }
        }
    }

    fn close_workflow(&self, batch: &mut DecisionBatch, status: WorkflowStatus, now: DateTime<Utc>) {
        let event_type = match status {
            WorkflowStatus::Completed => HistoryEventType::WorkflowCompleted,
            WorkflowStatus::Failed => HistoryEventType::WorkflowFailed,
            WorkflowStatus::Canceled => HistoryEventType::WorkflowCanceled,
            _ => HistoryEventType::WorkflowFailed,
        };
        if status != WorkflowStatus::Canceled {
            batch.push_event(event_type, now, json!({}));
        }
        batch.state.workflow_status = status;
        batch.callback = Some((event_type, json!({ "status": status.to_string() })));
        batch.visibility_closed = Some((now, status));
    }

    async fn load_definition(&self, key: &ExecutionKey) -> Result<WorkflowDefinition, EngineError> {
        let events = self.events.get_events(key, 1, 1).await?;
        let started = events.first().ok_or(EngineError::UnknownActivity(1))?;
        let def: WorkflowDefinition =
            serde_json::from_value(started.payload["workflow_def"].clone()).map_err(StorageError::from)?;
        Ok(def)
    }

    async fn commit(
        &self,
        key: &ExecutionKey,
        batch: DecisionBatch,
        expected_event_version: i64,
        old_db_version: i64,
    ) -> Result<(), EngineError> {
        match self.events.append_events(key, batch.events, expected_event_version).await {
            Ok(()) => {}
            Err(StorageError::VersionMismatch { .. }) => return Err(EngineError::Conflict),
            Err(e) => return Err(e.into()),
        }

        let history_length = batch.state.next_event_id - 1;
        match self.state.update(key, batch.state, old_db_version).await {
            Ok(()) => {}
            Err(StorageError::OptimisticLock { .. }) => return Err(EngineError::Conflict),
            Err(e) => return Err(e.into()),
        }

        if let Some(record) = batch.visibility_started {
            if let Err(err) = self.visibility.record_started(record).await {
                warn!(?err, "visibility record_started failed after commit");
            }
        }
        if let Some((close_time, status)) = batch.visibility_closed {
            if let Err(err) =
                self.visibility.record_closed(&key.namespace_id, &key.run_id, close_time, status, history_length).await
            {
                warn!(?err, "visibility record_closed failed after commit");
            }
        }

        for task in batch.activities {
            if let Err(SchedulingError(msg)) = self.activities.schedule(task).await {
                warn!(msg, "activity scheduling failed after commit");
            }
        }
        for timer in batch.timers {
            if let Err(SchedulingError(msg)) = self.timers.start(timer).await {
                warn!(msg, "timer scheduling failed after commit");
            }
        }
        for timer_id in batch.timer_cancellations {
            if let Err(SchedulingError(msg)) = self.timers.cancel(key, &timer_id).await {
                warn!(msg, "timer cancellation failed after commit");
            }
        }
        if let Some((event_type, payload)) = batch.callback {
            self.callbacks.notify(key, event_type, payload).await;
        }

        Ok(())
    }
}

/// Lets a [`WorkflowEngine`] be plugged directly into a
/// [`linkflow_timer::TimerService`] as its [`TimerDeliverer`]: the timer
/// scan loop hands fired timers straight to the engine, with no
/// intermediate RPC hop.
#[async_trait]
impl<EV, ST, VZ, AS, TS, CS> TimerDeliverer for WorkflowEngine<EV, ST, VZ, AS, TS, CS>
where
    EV: EventStore,
    ST: MutableStateStore,
    VZ: VisibilityStore,
    AS: ActivityScheduler,
    TS: TimerScheduler,
    CS: CallbackSink,
{
    async fn deliver(&self, timer: &Timer) -> Result<(), DeliveryError> {
        let key = ExecutionKey::new(timer.namespace_id.clone(), timer.workflow_id.clone(), timer.run_id.clone());
        let state = self.state.get(&key).await.map_err(|e| DeliveryError(e.to_string()))?;
        if state.is_terminal() {
            return Ok(());
        }
        let old_db_version = state.db_version;
        let expected_event_version = state.next_event_id - 1;
        let def = self.load_definition(&key).await.map_err(|e| DeliveryError(e.to_string()))?;

        let mut batch = DecisionBatch::new(key.clone(), state);
        let Some(info) = batch.state.pending_timers.remove(timer.timer_id.as_str()) else {
            return Ok(()); // already advanced by a prior delivery; nothing to do
        };

        batch.push_event(
            HistoryEventType::TimerFired,
            Utc::now(),
            json!({ "timer_id": timer.timer_id.as_str(), "node_id": info.blocked_node_id }),
        );
        self.complete_node(&def, &mut batch, &info.blocked_node_id, serde_json::Value::Null, Utc::now());

        self.commit(&key, batch, expected_event_version, old_db_version).await.map_err(|e| DeliveryError(e.to_string()))
    }
}

fn wait_task_type(signal_name: &str) -> String {
    format!("wait:{signal_name}")
}

fn node_already_active(state: &linkflow_core::MutableState, node_id: &str) -> bool {
    state.completed_nodes.contains_key(node_id)
        || state.pending_activities.values().any(|a| a.node_id == node_id)
        || state.pending_timers.values().any(|t| t.blocked_node_id == node_id)
}

fn workflow_is_complete(def: &WorkflowDefinition, state: &linkflow_core::MutableState) -> bool {
    if !state.pending_activities.is_empty() || !state.pending_timers.is_empty() {
        return false;
    }
    def.nodes
        .iter()
        .filter(|n| def.outgoing_edges(&n.id).filter(|e| !e.error_edge).count() == 0)
        .all(|n| state.completed_nodes.contains_key(&n.id))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
