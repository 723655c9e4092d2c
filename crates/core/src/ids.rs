// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types for the execution data model (§3).
//!
//! `NamespaceId`/`WorkflowId`/`TimerId`/`TaskQueueName` are caller-supplied
//! and may be arbitrary length, so they wrap `SmolStr` via
//! [`crate::define_str_id!`] rather than the fixed-capacity [`crate::id::IdBuf`].
//! `RunId` is engine-assigned and fits the generated-id convention.

crate::define_str_id! {
    /// Tenant/workspace scope. Caller-chosen, stable for the lifetime of the tenant.
    pub struct NamespaceId;
}

crate::define_str_id! {
    /// Caller-chosen workflow identity, also used as the idempotency key for starts.
    pub struct WorkflowId;
}

crate::define_str_id! {
    /// Unique within a run; duplicate `TimerStarted` for the same id is `AlreadyExists`.
    pub struct TimerId;
}

crate::define_str_id! {
    /// Logical destination `(namespace, task_queue_name)` workers poll from.
    pub struct TaskQueueName;
}

crate::define_id! {
    /// Engine-assigned, globally unique. A new one is allocated on retry or continue-as-new.
    pub struct RunId("run-");
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
