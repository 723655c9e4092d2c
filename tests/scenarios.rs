// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario and property coverage for the execution core,
//! driven against real in-memory storage, a real `MatchingService`, and a
//! real `InMemoryTimerStore` rather than fakes standing in for the
//! components under test.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use linkflow_core::{
    CoreErrorKind, ExecutionKey, NamespaceId, Priority, RunId, Task, TaskQueueName, Timer, TimerId, WorkflowId,
    WorkflowStatus,
};
use linkflow_engine::{
    ActivityScheduler, EngineConfig, NoopCallbackSink, SchedulingError, StartOutcome, TimerScheduler, WorkflowEngine,
};
use linkflow_matching::{FailOutcome, MatchingService, RateLimiter};
use linkflow_storage::{
    ChecksumMode, EventStore, InMemoryEventStore, InMemoryMutableStateStore, InMemoryTimerStore,
    InMemoryVisibilityStore, MutableStateStore, TimerStore, VisibilityStore,
};
use linkflow_timer::TimerDeliverer;
use linkflow_workflow::{Edge, JoinKind, Node, NodeType, WorkflowDefinition};
use serde_json::json;

/// Dispatches activities into a shared [`MatchingService`], mirroring
/// `linkflow-daemon`'s own `MatchingActivityScheduler` adapter.
struct MatchingActivityScheduler {
    matching: Arc<MatchingService>,
}

#[async_trait]
impl ActivityScheduler for MatchingActivityScheduler {
    async fn schedule(&self, task: Task) -> Result<(), SchedulingError> {
        self.matching.enqueue(task).map_err(|err| SchedulingError(err.to_string()))
    }
}

/// Starts and cancels durable timers against a real [`InMemoryTimerStore`].
struct StoreTimerScheduler {
    store: Arc<InMemoryTimerStore>,
}

#[async_trait]
impl TimerScheduler for StoreTimerScheduler {
    async fn start(&self, timer: Timer) -> Result<(), SchedulingError> {
        self.store.insert(timer).await.map_err(|err| SchedulingError(err.to_string()))
    }

    async fn cancel(&self, key: &ExecutionKey, timer_id: &TimerId) -> Result<(), SchedulingError> {
        self.store.cancel(key, timer_id, Utc::now()).await.map_err(|err| SchedulingError(err.to_string()))
    }
}

type TestEngine = WorkflowEngine<
    InMemoryEventStore,
    InMemoryMutableStateStore,
    InMemoryVisibilityStore,
    MatchingActivityScheduler,
    StoreTimerScheduler,
    NoopCallbackSink,
>;

struct Harness {
    engine: TestEngine,
    events: Arc<InMemoryEventStore>,
    state: Arc<InMemoryMutableStateStore>,
    visibility: Arc<InMemoryVisibilityStore>,
    timers: Arc<InMemoryTimerStore>,
    matching: Arc<MatchingService>,
}

fn harness() -> Harness {
    let events = InMemoryEventStore::new();
    let state = InMemoryMutableStateStore::new(ChecksumMode::Strict);
    let visibility = InMemoryVisibilityStore::new();
    let timers = InMemoryTimerStore::new();
    let matching = Arc::new(MatchingService::new(RateLimiter::default()));

    let engine = WorkflowEngine::new(
        events.clone(),
        state.clone(),
        visibility.clone(),
        Arc::new(MatchingActivityScheduler { matching: matching.clone() }),
        Arc::new(StoreTimerScheduler { store: timers.clone() }),
        Arc::new(NoopCallbackSink),
        EngineConfig::default(),
    );

    Harness { engine, events, state, visibility, timers, matching }
}

fn activity_node(id: &str, queue: &str) -> Node {
    Node {
        id: id.to_string(),
        node_type: NodeType::Activity { task_queue: TaskQueueName::new(queue), node_config: json!({}) },
        join: JoinKind::And,
        max_attempts: 1,
    }
}

fn activity_node_with_attempts(id: &str, queue: &str, max_attempts: u32) -> Node {
    Node { max_attempts, ..activity_node(id, queue) }
}

fn delay_node(id: &str, secs: u64) -> Node {
    Node { node_type: NodeType::Delay { duration: Duration::from_secs(secs) }, ..activity_node(id, "default") }
}

fn edge(from: &str, to: &str) -> Edge {
    Edge { from: from.to_string(), to: to.to_string(), condition: None, error_edge: false }
}

fn conditional_edge(from: &str, to: &str, condition: &str) -> Edge {
    Edge { from: from.to_string(), to: to.to_string(), condition: Some(condition.to_string()), error_edge: false }
}

fn def(nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowDefinition {
    WorkflowDefinition { nodes, edges, settings: Default::default() }
}

async fn start(
    h: &Harness,
    namespace: &str,
    workflow_id: &str,
    definition: WorkflowDefinition,
    input: serde_json::Value,
    idempotency_key: Option<&str>,
) -> (ExecutionKey, StartOutcome) {
    let namespace_id = NamespaceId::new(namespace);
    let (run_id, outcome) = h
        .engine
        .start_workflow(
            namespace_id.clone(),
            WorkflowId::new(workflow_id),
            "demo".to_string(),
            definition,
            input,
            idempotency_key.map(str::to_string),
            Utc::now(),
        )
        .await
        .unwrap();
    (ExecutionKey::new(namespace_id, WorkflowId::new(workflow_id), run_id), outcome)
}

async fn pending_event_id(state: &InMemoryMutableStateStore, key: &ExecutionKey, node_id: &str) -> i64 {
    let s = state.get(key).await.unwrap();
    *s.pending_activities.iter().find(|(_, info)| info.node_id == node_id).map(|(id, _)| id).unwrap()
}

// S1 — linear A -> B -> C, all activities succeed, workflow completes.
#[tokio::test]
async fn s1_linear_chain_completes_in_order() {
    let h = harness();
    let workflow = def(
        vec![activity_node("a", "q"), activity_node("b", "q"), activity_node("c", "q")],
        vec![edge("a", "b"), edge("b", "c")],
    );
    let (key, _) = start(&h, "acme", "wf-linear", workflow, json!({}), None).await;

    for node_id in ["a", "b", "c"] {
        let polled = h.matching.poll_one("acme", &TaskQueueName::new("q"), "worker-1").unwrap().unwrap();
        assert_eq!(polled.task.node_id, node_id);
        h.matching.complete("acme", &TaskQueueName::new("q"), &polled.task.task_id, &polled.lease_token).unwrap();

        let event_id = pending_event_id(&h.state, &key, node_id).await;
        h.engine.complete_activity(&key, event_id, json!({}), Utc::now()).await.unwrap();
    }

    let state = h.state.get(&key).await.unwrap();
    assert_eq!(state.workflow_status, WorkflowStatus::Completed);
    assert_eq!(h.events.get_event_count(&key).await.unwrap(), 8, "started + 3x(scheduled+completed) + completed");
}

// S2 — an activity fails Retryable with max_attempts = 2: one requeue with
// backoff, then exhaustion closes the workflow Failed.
#[tokio::test]
async fn s2_retryable_failure_exhausts_then_fails_workflow() {
    let h = harness();
    let workflow = def(vec![activity_node_with_attempts("b", "q", 2)], vec![]);
    let (key, _) = start(&h, "acme", "wf-retry", workflow, json!({}), None).await;

    let queue = TaskQueueName::new("q");
    let first = h.matching.poll_one("acme", &queue, "worker-1").unwrap().unwrap();
    assert_eq!(first.task.attempts, 1);
    let outcome = h
        .matching
        .fail("acme", &queue, &first.task.task_id, &first.lease_token, CoreErrorKind::Retryable)
        .unwrap();
    assert_eq!(outcome, FailOutcome::Requeued, "first failure backs off rather than exhausting");

    let state = h.state.get(&key).await.unwrap();
    assert_eq!(state.workflow_status, WorkflowStatus::Running, "not failed yet");

    let not_yet_visible = h.matching.poll_one("acme", &queue, "worker-1").unwrap();
    assert!(not_yet_visible.is_none(), "task is not visible again until its 1s backoff elapses");

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let requeued = h.matching.poll_one("acme", &queue, "worker-1").unwrap().unwrap();
    assert_eq!(requeued.task.attempts, 2);
    let outcome = h
        .matching
        .fail("acme", &queue, &requeued.task.task_id, &requeued.lease_token, CoreErrorKind::Retryable)
        .unwrap();
    assert_eq!(outcome, FailOutcome::Exhausted, "second failure exhausts max_attempts = 2");

    let event_id = pending_event_id(&h.state, &key, "b").await;
    h.engine.fail_activity(&key, event_id, "boom".to_string(), Utc::now()).await.unwrap();

    let state = h.state.get(&key).await.unwrap();
    assert_eq!(state.workflow_status, WorkflowStatus::Failed);
    assert_eq!(state.failed_node_id.as_deref(), Some("b"));
}

// S3 — branch A -> (B | C) gated by a condition that evaluates true for B
// only; C must never be scheduled.
#[tokio::test]
async fn s3_conditional_branch_schedules_only_the_satisfied_edge() {
    let h = harness();
    let workflow = def(
        vec![activity_node("a", "q"), activity_node("b", "q"), activity_node("c", "q")],
        vec![conditional_edge("a", "b", "go_b"), conditional_edge("a", "c", "go_c")],
    );
    let (key, _) = start(&h, "acme", "wf-branch", workflow, json!({}), None).await;

    let a_id = pending_event_id(&h.state, &key, "a").await;
    h.engine.complete_activity(&key, a_id, json!({ "go_b": true }), Utc::now()).await.unwrap();

    let state = h.state.get(&key).await.unwrap();
    assert!(state.pending_activities.values().any(|info| info.node_id == "b"));
    assert!(!state.pending_activities.values().any(|info| info.node_id == "c"), "go_c is falsy, C must not schedule");
}

// S4 — a Delay(5s) node starts a durable timer; once it fires, downstream
// work is scheduled.
#[tokio::test]
async fn s4_delay_node_fires_timer_and_schedules_downstream() {
    let h = harness();
    let workflow = def(vec![delay_node("wait", 5), activity_node("after", "q")], vec![edge("wait", "after")]);
    let (key, _) = start(&h, "acme", "wf-delay", workflow, json!({}), None).await;

    let due = h.timers.fetch_due(key.shard_id(16), Utc::now() + chrono::Duration::seconds(6), 10).await.unwrap();
    assert_eq!(due.len(), 1);
    let timer = &due[0];

    h.engine.deliver(timer).await.unwrap();

    let state = h.state.get(&key).await.unwrap();
    assert!(state.pending_activities.values().any(|info| info.node_id == "after"));

    // redelivery of an already-fired timer is a no-op
    let before = state.pending_activities.len();
    h.engine.deliver(timer).await.unwrap();
    let state = h.state.get(&key).await.unwrap();
    assert_eq!(state.pending_activities.len(), before);
}

// S5 — cancellation mid-flight moves the run terminal and cancels pending timers.
#[tokio::test]
async fn s5_cancel_mid_flight_cancels_pending_timers() {
    let h = harness();
    let workflow = def(vec![delay_node("wait", 60), activity_node("after", "q")], vec![edge("wait", "after")]);
    let (key, _) = start(&h, "acme", "wf-cancel", workflow, json!({}), None).await;

    let state_before = h.state.get(&key).await.unwrap();
    assert_eq!(state_before.pending_timers.len(), 1, "the delay node has a pending timer before cancellation");

    h.engine.cancel_workflow(&key, "user requested", Utc::now()).await.unwrap();

    let state = h.state.get(&key).await.unwrap();
    assert_eq!(state.workflow_status, WorkflowStatus::Canceled);

    let still_due = h.timers.fetch_due(key.shard_id(16), Utc::now() + chrono::Duration::seconds(120), 10).await.unwrap();
    assert!(still_due.is_empty(), "the canceled run's timer must not remain pending");
}

// S6 / P3 — concurrent starts with the same idempotency key land on one run.
#[tokio::test]
async fn s6_idempotent_start_returns_the_same_run() {
    let h = harness();
    let workflow = def(vec![activity_node("a", "q")], vec![]);

    let (key1, outcome1) = start(&h, "acme", "wf-idem", workflow.clone(), json!({}), Some("key-1")).await;
    assert!(outcome1.started);

    let (key2, outcome2) = start(&h, "acme", "wf-idem", workflow, json!({}), Some("key-1")).await;
    assert!(!outcome2.started, "a repeat start with the same idempotency key must not start a new run");
    assert_eq!(key1.run_id, key2.run_id);

    let queue = TaskQueueName::new("q");
    assert_eq!(h.matching.queue_len("acme", &queue), 1, "the root activity is scheduled exactly once");
}

// P1 — event ids are contiguous, starting at 1.
#[tokio::test]
async fn p1_event_ids_are_contiguous_from_one() {
    let h = harness();
    let workflow = def(vec![activity_node("a", "q"), activity_node("b", "q")], vec![edge("a", "b")]);
    let (key, _) = start(&h, "acme", "wf-contig", workflow, json!({}), None).await;

    let a_id = pending_event_id(&h.state, &key, "a").await;
    h.engine.complete_activity(&key, a_id, json!({}), Utc::now()).await.unwrap();
    let b_id = pending_event_id(&h.state, &key, "b").await;
    h.engine.complete_activity(&key, b_id, json!({}), Utc::now()).await.unwrap();

    let count = h.events.get_event_count(&key).await.unwrap();
    let all = h.events.get_events(&key, 1, count).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|e| e.event_id).collect();
    let expected: Vec<i64> = (1..=count).collect();
    assert_eq!(ids, expected);
}

// P2 — db_version advances by exactly 1 per committed decision batch.
#[tokio::test]
async fn p2_db_version_is_monotonic_per_commit() {
    let h = harness();
    let workflow = def(vec![activity_node("a", "q"), activity_node("b", "q")], vec![edge("a", "b")]);
    let (key, _) = start(&h, "acme", "wf-version", workflow, json!({}), None).await;

    let v0 = h.state.get(&key).await.unwrap().db_version;
    let a_id = pending_event_id(&h.state, &key, "a").await;
    h.engine.complete_activity(&key, a_id, json!({}), Utc::now()).await.unwrap();
    let v1 = h.state.get(&key).await.unwrap().db_version;
    assert_eq!(v1, v0 + 1);

    let b_id = pending_event_id(&h.state, &key, "b").await;
    h.engine.complete_activity(&key, b_id, json!({}), Utc::now()).await.unwrap();
    let v2 = h.state.get(&key).await.unwrap().db_version;
    assert_eq!(v2, v1 + 1);
}

// P4 — a timer due by `now` is delivered by a single scan/fetch pass.
#[tokio::test]
async fn p4_due_timer_is_visible_within_one_scan() {
    let h = harness();
    let workflow = def(vec![delay_node("wait", 1)], vec![]);
    let (key, _) = start(&h, "acme", "wf-scan", workflow, json!({}), None).await;

    let not_yet = h.timers.fetch_due(key.shard_id(16), Utc::now(), 10).await.unwrap();
    assert!(not_yet.is_empty(), "the timer isn't due before its fire_time");

    let due = h.timers.fetch_due(key.shard_id(16), Utc::now() + chrono::Duration::seconds(2), 10).await.unwrap();
    assert_eq!(due.len(), 1);
}

// P5 — Matching polls the highest-priority visible task, ties broken by the
// earliest scheduled_at.
#[tokio::test]
async fn p5_matching_polls_highest_priority_first() {
    let matching = MatchingService::new(RateLimiter::default());
    let queue = TaskQueueName::new("q");
    let key = ExecutionKey::new(NamespaceId::new("acme"), WorkflowId::new("wf-priority"), RunId::new());

    let low = Task {
        task_id: "low".to_string(),
        namespace: "acme".to_string(),
        task_queue: queue.clone(),
        execution_key: key.clone(),
        node_id: "low".to_string(),
        task_type: "activity".to_string(),
        priority: Priority::LOW,
        payload: json!({}),
        scheduled_at: Utc::now(),
        visible_at: Utc::now(),
        attempts: 0,
        max_attempts: 1,
        timeout: Duration::from_secs(30),
    };
    let high = Task { task_id: "high".to_string(), priority: Priority::HIGH, ..low.clone() };

    matching.enqueue(low).unwrap();
    matching.enqueue(high).unwrap();

    let polled = matching.poll_one("acme", &queue, "worker-1").unwrap().unwrap();
    assert_eq!(polled.task.task_id, "high", "the higher-priority task is polled first regardless of enqueue order");
}

// P8 — keyset pagination over the Visibility Store visits every record
// exactly once and terminates with a null token.
#[tokio::test]
async fn p8_visibility_pagination_visits_every_record_once() {
    let h = harness();
    for i in 0..5 {
        let workflow = def(vec![activity_node("a", "q")], vec![]);
        start(&h, "acme", &format!("wf-page-{i}"), workflow, json!({}), None).await;
    }

    let namespace_id = NamespaceId::new("acme");
    let mut seen = std::collections::HashSet::new();
    let mut token = None;
    loop {
        let page = h.visibility.list_open(&namespace_id, 2, token.as_deref()).await.unwrap();
        for record in &page.records {
            assert!(seen.insert(record.run_id.clone()), "a keyset page must not repeat a record");
        }
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(seen.len(), 5);
}
