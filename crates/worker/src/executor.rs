// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node executor contract (§4.G): "executors are invoked with node config
//! (JSON after variable interpolation), upstream inputs from
//! `completed_nodes`, decrypted credentials scoped to the execution, and a
//! cancellable context."
//!
//! `node_config` is opaque to the DAG model (§2: "node-type specific I/O ...
//! is out of scope"), so the registry key an executor is looked up under is a
//! convention of this crate: the `"node_type"` string field inside the
//! interpolated config (§7.6 Open Question decision, see DESIGN.md).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use linkflow_core::{CoreErrorKind, ExecutionKey};
use parking_lot::RwLock;
use serde_json::Value;

/// A structured failure from an executor. `kind` should be one of
/// `Retryable`, `NonRetryable`, or `Timeout`; other kinds are reserved for
/// resilience-layer-generated failures (`CircuitOpen`, `ExecutorNotFound`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("executor failed ({kind}): {message}")]
pub struct ExecutorError {
    pub kind: CoreErrorKind,
    pub message: String,
}

impl ExecutorError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self { kind: CoreErrorKind::Retryable, message: message.into() }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self { kind: CoreErrorKind::NonRetryable, message: message.into() }
    }
}

/// Everything an executor needs to run a single node attempt.
pub struct ExecutionContext {
    pub execution_key: ExecutionKey,
    pub node_id: String,
    pub node_type: String,
    /// `node_config` after `{{var}}` interpolation.
    pub config: Value,
    /// `completed_nodes[*].output`, keyed by node id.
    pub upstream_inputs: HashMap<String, Value>,
    /// Decrypted credentials, or a reference handle — shaped by
    /// `send_sensitive_context` (see `CredentialSource`).
    pub credentials: Value,
    pub attempt: u32,
}

/// Executes one node type. Implementations own their own I/O (HTTP, email,
/// SQL, ...); that surface is deliberately outside this crate's model.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutorError>;
}

/// Resolves the credential payload passed to [`ExecutionContext::credentials`]
/// right before invocation, so secrets are decrypted as late as possible and
/// never touch `MutableState` or the history store.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn resolve(&self, key: &ExecutionKey, node_id: &str) -> Value;
}

/// A `CredentialSource` with nothing to resolve; suitable when nodes carry no
/// credential references.
pub struct NoCredentials;

#[async_trait]
impl CredentialSource for NoCredentials {
    async fn resolve(&self, _key: &ExecutionKey, _node_id: &str) -> Value {
        Value::Null
    }
}

/// Extracts the executor lookup key from an (already-interpolated) node
/// config. Returns `None` when the config carries no `"node_type"` field.
pub fn node_type_of(config: &Value) -> Option<&str> {
    config.get("node_type").and_then(Value::as_str)
}

/// Double-checked lazy registry of executors by `node_type` string, mirroring
/// the single-lock-with-lazy-insertion shared-resource policy (§4.G).
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn NodeExecutor>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
        self.executors.write().insert(node_type.into(), executor);
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.read().get(node_type).cloned()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
