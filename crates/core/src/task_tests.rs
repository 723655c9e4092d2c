// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn deterministic_id_is_stable_for_same_inputs() {
    let a = Task::deterministic_id("acme", "wf-1", "run-1", "activity", 3);
    let b = Task::deterministic_id("acme", "wf-1", "run-1", "activity", 3);
    assert_eq!(a, b);
    assert_eq!(a, "acme:wf-1:run-1:activity:3");
}

#[test]
fn backoff_follows_schedule_then_caps() {
    assert_eq!(backoff_for_attempt(1).as_secs(), 1);
    assert_eq!(backoff_for_attempt(2).as_secs(), 2);
    assert_eq!(backoff_for_attempt(6).as_secs(), 60);
    assert_eq!(backoff_for_attempt(100).as_secs(), 60);
}

#[test]
fn priority_ordering_is_numeric() {
    assert!(Priority::HIGH > Priority::NORMAL);
    assert!(Priority::NORMAL > Priority::LOW);
}

#[test]
fn scheduled_event_id_recovers_trailing_segment() {
    let id = Task::deterministic_id("acme", "wf-1", "run-1", "activity", 42);
    let task = Task {
        task_id: id,
        namespace: "acme".to_string(),
        task_queue: crate::ids::TaskQueueName::new("default"),
        execution_key: crate::test_support::execution_key("acme", "wf-1"),
        node_id: "a".to_string(),
        task_type: "activity".to_string(),
        priority: Priority::NORMAL,
        payload: serde_json::json!({}),
        scheduled_at: chrono::Utc::now(),
        visible_at: chrono::Utc::now(),
        attempts: 0,
        max_attempts: 1,
        timeout: std::time::Duration::from_secs(30),
    };
    assert_eq!(task.scheduled_event_id(), Some(42));
}

#[test]
fn scheduled_event_id_is_none_for_malformed_id() {
    let task = Task {
        task_id: "not-an-id".to_string(),
        namespace: "acme".to_string(),
        task_queue: crate::ids::TaskQueueName::new("default"),
        execution_key: crate::test_support::execution_key("acme", "wf-1"),
        node_id: "a".to_string(),
        task_type: "activity".to_string(),
        priority: Priority::NORMAL,
        payload: serde_json::json!({}),
        scheduled_at: chrono::Utc::now(),
        visible_at: chrono::Utc::now(),
        attempts: 0,
        max_attempts: 1,
        timeout: std::time::Duration::from_secs(30),
    };
    assert_eq!(task.scheduled_event_id(), None);
}
