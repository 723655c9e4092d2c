// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use chrono::Utc;
use linkflow_core::test_support::execution_key;
use linkflow_core::{CoreErrorKind, Priority, Task, TaskQueueName};

use super::*;

fn make_task(task_id: &str, namespace: &str, priority: Priority) -> Task {
    Task {
        task_id: task_id.to_string(),
        namespace: namespace.to_string(),
        task_queue: TaskQueueName::new("default"),
        execution_key: execution_key(namespace, "wf"),
        node_id: "A".to_string(),
        task_type: "activity".to_string(),
        priority,
        payload: serde_json::json!({}),
        scheduled_at: Utc::now(),
        visible_at: Utc::now(),
        attempts: 0,
        max_attempts: 3,
        timeout: Duration::from_secs(30),
    }
}

fn unlimited_service() -> MatchingService {
    MatchingService::new(RateLimiter::new(RateLimitConfig::new(1e9, 1e9), RateLimitConfig::new(1e9, 1e9)))
}

#[test]
fn poll_one_returns_highest_priority_first() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    service.enqueue(make_task("low", "ns", Priority::LOW)).unwrap();
    service.enqueue(make_task("high", "ns", Priority::HIGH)).unwrap();
    service.enqueue(make_task("normal", "ns", Priority::NORMAL)).unwrap();

    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();
    assert_eq!(polled.task.task_id, "high");
}

#[test]
fn poll_one_breaks_priority_ties_by_earliest_scheduled_at() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    let mut earlier = make_task("earlier", "ns", Priority::NORMAL);
    earlier.scheduled_at = Utc::now() - chrono::Duration::seconds(10);
    let later = make_task("later", "ns", Priority::NORMAL);

    service.enqueue(later).unwrap();
    service.enqueue(earlier).unwrap();

    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();
    assert_eq!(polled.task.task_id, "earlier");
}

#[test]
fn poll_one_skips_tasks_not_yet_visible() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    let mut delayed = make_task("delayed", "ns", Priority::HIGH);
    delayed.visible_at = Utc::now() + chrono::Duration::seconds(60);
    service.enqueue(delayed).unwrap();

    assert!(service.poll_one("ns", &queue, "worker-1").unwrap().is_none());
}

#[test]
fn enqueue_fails_when_queue_is_full() {
    let service = MatchingService::with_capacity(
        RateLimiter::new(RateLimitConfig::new(1e9, 1e9), RateLimitConfig::new(1e9, 1e9)),
        1,
    );
    service.enqueue(make_task("a", "ns", Priority::NORMAL)).unwrap();
    let err = service.enqueue(make_task("b", "ns", Priority::NORMAL)).unwrap_err();
    assert_eq!(err, MatchingError::QueueFull);
}

#[test]
fn complete_requires_matching_lease_token() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    service.enqueue(make_task("a", "ns", Priority::NORMAL)).unwrap();
    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();

    let err = service.complete("ns", &queue, "a", "wrong-token").unwrap_err();
    assert_eq!(err, MatchingError::LeaseMismatch("a".to_string()));

    service.complete("ns", &queue, "a", &polled.lease_token).unwrap();
    assert_eq!(service.queue_len("ns", &queue), 0);
}

#[test]
fn fail_with_retryable_error_reenqueues_with_backoff_visible_at() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    service.enqueue(make_task("a", "ns", Priority::NORMAL)).unwrap();
    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();

    let outcome = service.fail("ns", &queue, "a", &polled.lease_token, CoreErrorKind::Retryable).unwrap();
    assert_eq!(outcome, FailOutcome::Requeued);

    assert!(
        service.poll_one("ns", &queue, "worker-1").unwrap().is_none(),
        "task must not be pollable before its backoff-derived visible_at"
    );
}

#[test]
fn fail_exhausts_after_max_attempts() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    let mut task = make_task("a", "ns", Priority::NORMAL);
    task.max_attempts = 1;
    service.enqueue(task).unwrap();

    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();
    let outcome = service.fail("ns", &queue, "a", &polled.lease_token, CoreErrorKind::Retryable).unwrap();
    assert_eq!(outcome, FailOutcome::Exhausted);
    assert_eq!(service.queue_len("ns", &queue), 0);
}

#[test]
fn fail_with_non_retryable_error_exhausts_immediately() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    service.enqueue(make_task("a", "ns", Priority::NORMAL)).unwrap();
    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();

    let outcome = service.fail("ns", &queue, "a", &polled.lease_token, CoreErrorKind::NonRetryable).unwrap();
    assert_eq!(outcome, FailOutcome::Exhausted);
}

#[test]
fn expired_lease_returns_task_to_pollable_on_next_poll() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    let mut task = make_task("a", "ns", Priority::NORMAL);
    task.timeout = Duration::from_millis(1);
    service.enqueue(task).unwrap();

    let first = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    let second = service.poll_one("ns", &queue, "worker-2").unwrap().unwrap();

    assert_eq!(second.task.task_id, "a");
    assert_ne!(first.lease_token, second.lease_token);
    assert_eq!(second.task.attempts, 2, "re-polling an expired lease counts as another attempt");
}

#[test]
fn extend_lease_pushes_out_expiry() {
    let service = unlimited_service();
    let queue = TaskQueueName::new("default");
    let mut task = make_task("a", "ns", Priority::NORMAL);
    task.timeout = Duration::from_millis(10);
    service.enqueue(task).unwrap();

    let polled = service.poll_one("ns", &queue, "worker-1").unwrap().unwrap();
    service.extend_lease("ns", &queue, "a", &polled.lease_token, Duration::from_secs(60)).unwrap();

    std::thread::sleep(Duration::from_millis(20));
    assert!(
        service.poll_one("ns", &queue, "worker-2").unwrap().is_none(),
        "extended lease must not have expired yet"
    );
}

#[test]
fn poll_one_denied_when_rate_limited() {
    let service = MatchingService::new(RateLimiter::new(RateLimitConfig::new(0.0, 0.0), RateLimitConfig::new(0.0, 0.0)));
    let queue = TaskQueueName::new("default");
    let err = service.poll_one("ns", &queue, "worker-1").unwrap_err();
    assert_eq!(err, MatchingError::RateLimited);
}
