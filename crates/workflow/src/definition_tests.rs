// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use linkflow_core::TaskQueueName;
use serde_json::json;

use super::*;

fn activity_node(id: &str) -> Node {
    Node {
        id: id.to_string(),
        node_type: NodeType::Activity { task_queue: TaskQueueName::new("default"), node_config: json!({}) },
        join: JoinKind::And,
        max_attempts: 1,
    }
}

fn edge(from: &str, to: &str) -> Edge {
    Edge { from: from.to_string(), to: to.to_string(), condition: None, error_edge: false }
}

#[test]
fn linear_workflow_validates_and_has_single_root() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("B"), activity_node("C")],
        edges: vec![edge("A", "B"), edge("B", "C")],
        settings: WorkflowSettings::default(),
    };

    def.validate().unwrap();
    assert_eq!(def.root_nodes(), vec![&"A".to_string()]);
}

#[test]
fn duplicate_node_id_is_rejected() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("A")],
        edges: vec![],
        settings: WorkflowSettings::default(),
    };

    assert_eq!(def.validate().unwrap_err(), ValidationError::DuplicateNodeId("A".to_string()));
}

#[test]
fn dangling_edge_is_rejected() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A")],
        edges: vec![edge("A", "ghost")],
        settings: WorkflowSettings::default(),
    };

    assert_eq!(def.validate().unwrap_err(), ValidationError::DanglingEdge("ghost".to_string()));
}

#[test]
fn cycle_is_rejected() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("B")],
        edges: vec![edge("A", "B"), edge("B", "A")],
        settings: WorkflowSettings::default(),
    };

    assert_eq!(def.validate().unwrap_err(), ValidationError::Cyclic);
}

#[test]
fn conditional_edge_is_satisfied_only_when_output_key_is_truthy() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("cond"), activity_node("B"), activity_node("C")],
        edges: vec![
            Edge { from: "cond".to_string(), to: "B".to_string(), condition: Some("go".to_string()), error_edge: false },
            Edge { from: "cond".to_string(), to: "C".to_string(), condition: Some("go".to_string()), error_edge: false },
        ],
        settings: WorkflowSettings::default(),
    };

    let mut completed = HashMap::new();
    completed.insert("cond".to_string(), json!({"go": true}));
    assert!(def.join_satisfied("B", &completed));

    completed.insert("cond".to_string(), json!({"go": false}));
    assert!(!def.join_satisfied("C", &completed));
}

#[test]
fn and_join_requires_all_predecessors() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("B"), activity_node("join")],
        edges: vec![edge("A", "join"), edge("B", "join")],
        settings: WorkflowSettings::default(),
    };

    let mut completed = HashMap::new();
    completed.insert("A".to_string(), json!({}));
    assert!(!def.join_satisfied("join", &completed), "only one of two AND predecessors completed");

    completed.insert("B".to_string(), json!({}));
    assert!(def.join_satisfied("join", &completed));
}

#[test]
fn or_join_requires_any_predecessor() {
    let mut join_node = activity_node("join");
    join_node.join = JoinKind::Or;
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("B"), join_node],
        edges: vec![edge("A", "join"), edge("B", "join")],
        settings: WorkflowSettings::default(),
    };

    let mut completed = HashMap::new();
    completed.insert("A".to_string(), json!({}));
    assert!(def.join_satisfied("join", &completed));
}

#[test]
fn error_edge_is_found_independent_of_plain_edges() {
    let def = WorkflowDefinition {
        nodes: vec![activity_node("A"), activity_node("B"), activity_node("fallback")],
        edges: vec![edge("A", "B"), Edge { from: "A".to_string(), to: "fallback".to_string(), condition: None, error_edge: true }],
        settings: WorkflowSettings::default(),
    };

    let err_edge = def.error_edge("A").unwrap();
    assert_eq!(err_edge.to, "fallback");
}

#[test]
fn empty_workflow_has_no_root() {
    let def = WorkflowDefinition { nodes: vec![], edges: vec![], settings: WorkflowSettings::default() };
    assert_eq!(def.validate().unwrap_err(), ValidationError::NoRoot);
}
