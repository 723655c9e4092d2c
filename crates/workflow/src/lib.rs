// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! linkflow-workflow: the `WorkflowDefinition` DAG type consumed by the
//! engine (§4.F). Nodes + edges + settings, validated for acyclicity and
//! dangling edges at accept time and re-checked by the engine on start.

mod definition;

pub use definition::{
    Edge, JoinKind, Node, NodeType, ValidationError, WorkflowDefinition,
};
