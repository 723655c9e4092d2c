// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG type: nodes + edges + settings (§2, §4.F).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use linkflow_core::TaskQueueName;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type NodeId = String;

/// What a node does once scheduled as an activity. Node-type specific I/O
/// (HTTP, email, SQL, LLM calls) is out of scope (§1); the DAG only needs to
/// know enough to route the engine's decision logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeType {
    /// Dispatched to Matching as a task for a worker to execute (§4.G).
    Activity { task_queue: TaskQueueName, node_config: serde_json::Value },
    /// Starts a durable timer; the downstream edge fires on `TimerFired` (§4.F.3).
    Delay { duration: Duration },
    /// Blocks until a matching `SignalReceived` (§4.F.3).
    Wait { signal_name: String },
}

/// Whether a node with multiple incoming edges requires all predecessors to
/// complete (AND-join) or any one of them (OR-join) before it is scheduled
/// (§4.F.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    And,
    Or,
}

impl Default for JoinKind {
    fn default() -> Self {
        JoinKind::And
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    #[serde(default)]
    pub join: JoinKind,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    1
}

/// A directed edge from one node to another.
///
/// `condition` names a key expected in the source node's `NodeResult` output
/// (a bare JSON object); the edge is only eligible when that key is truthy
/// (§4.F.2: "evaluate using completed_nodes context"). `error_edge` marks the
/// edge as the target to follow on `ActivityFailed` instead of the normal
/// success fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub error_edge: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowSettings {
    pub workflow_type: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("edge references unknown node: {0}")]
    DanglingEdge(String),
    #[error("workflow graph contains a cycle")]
    Cyclic,
    #[error("workflow has no root node (a node with no incoming edges)")]
    NoRoot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub settings: WorkflowSettings,
}

impl WorkflowDefinition {
    /// Re-checked by the engine on start even though the control plane
    /// already validated at accept time (§4.F: "the engine re-checks on
    /// start and fails with `InvalidWorkflow` on cycles or dangling edges").
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            if !seen.contains(edge.from.as_str()) {
                return Err(ValidationError::DanglingEdge(edge.from.clone()));
            }
            if !seen.contains(edge.to.as_str()) {
                return Err(ValidationError::DanglingEdge(edge.to.clone()));
            }
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.id.as_str());
        }
        for edge in &self.edges {
            graph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
        }

        if is_cyclic_directed(&graph) {
            return Err(ValidationError::Cyclic);
        }

        if self.root_nodes().is_empty() {
            return Err(ValidationError::NoRoot);
        }

        Ok(())
    }

    /// Nodes with no incoming edges — the nodes scheduled on `StartWorkflow` (§4.F.1).
    pub fn root_nodes(&self) -> Vec<&NodeId> {
        let has_incoming: HashSet<&str> = self.edges.iter().map(|e| e.to.as_str()).collect();
        self.nodes.iter().map(|n| &n.id).filter(|id| !has_incoming.contains(id.as_str())).collect()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges from `node_id`, split by whether they're the error edge.
    pub fn outgoing_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == node_id)
    }

    /// Incoming (non-error) edges into `node_id`, used to evaluate AND/OR joins.
    pub fn incoming_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == node_id && !e.error_edge)
    }

    /// The single error edge out of `node_id`, if the definition has one.
    pub fn error_edge(&self, node_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == node_id && e.error_edge)
    }

    /// Whether `node_id`'s join precondition is satisfied given the set of
    /// node ids already present in `completed_nodes` (§4.F.2).
    pub fn join_satisfied(&self, node_id: &str, completed: &HashMap<NodeId, serde_json::Value>) -> bool {
        let predecessors: Vec<&Edge> = self.incoming_edges(node_id).collect();
        if predecessors.is_empty() {
            return true;
        }

        let node = match self.node(node_id) {
            Some(n) => n,
            None => return false,
        };

        match node.join {
            JoinKind::And => predecessors.iter().all(|e| edge_satisfied(e, completed)),
            JoinKind::Or => predecessors.iter().any(|e| edge_satisfied(e, completed)),
        }
    }
}

fn edge_satisfied(edge: &Edge, completed: &HashMap<NodeId, serde_json::Value>) -> bool {
    let Some(output) = completed.get(&edge.from) else {
        return false;
    };

    match &edge.condition {
        None => true,
        Some(key) => output.get(key).map(is_truthy).unwrap_or(false),
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => true,
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
