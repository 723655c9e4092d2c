// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution identity and shard routing (§2, §3).

use std::hash::{Hash, Hasher};

use crate::ids::{NamespaceId, RunId, WorkflowId};

/// Immutable identity of a run: `(namespace_id, workflow_id, run_id)`.
///
/// `workflow_id` is caller-chosen and doubles as an idempotency key for
/// starts within a namespace; `run_id` is engine-assigned and globally
/// unique, with a fresh one allocated on retry or continue-as-new.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ExecutionKey {
    pub namespace_id: NamespaceId,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
}

impl ExecutionKey {
    pub fn new(namespace_id: NamespaceId, workflow_id: WorkflowId, run_id: RunId) -> Self {
        Self { namespace_id, workflow_id, run_id }
    }

    /// `shard_id = hash(namespace_id + "/" + workflow_id) mod N` (§2).
    ///
    /// Deliberately excludes `run_id`: retries and continue-as-new reuse the
    /// same `workflow_id` and must land on the same shard so timer/matching
    /// ownership doesn't move mid-run-chain.
    pub fn shard_id(&self, shard_count: u32) -> u32 {
        shard_of(&self.namespace_id, &self.workflow_id, shard_count)
    }
}

/// Standalone shard routing function, used before a full [`ExecutionKey`]
/// exists (e.g. to decide which engine instance should accept a `StartWorkflow`).
pub fn shard_of(namespace_id: &NamespaceId, workflow_id: &WorkflowId, shard_count: u32) -> u32 {
    debug_assert!(shard_count > 0, "shard_count must be positive");
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    namespace_id.as_str().hash(&mut hasher);
    "/".hash(&mut hasher);
    workflow_id.as_str().hash(&mut hasher);
    (hasher.finish() % shard_count as u64) as u32
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
