// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! linkflow-engine: the Workflow Engine state machine (§4.F) and the
//! Variable Resolver (§4.E). Drives DAG execution from the history store and
//! mutable-state store in `linkflow-storage`, scheduling activities and
//! timers through trait-based sinks so this crate has no compile-time
//! dependency on `linkflow-matching`, `linkflow-timer`'s scan loop, or
//! `linkflow-callback`.

mod effects;
mod engine;
mod error;
mod vars;

pub use effects::{ActivityScheduler, CallbackSink, NoopCallbackSink, SchedulingError, TimerScheduler};
pub use engine::{EngineConfig, StartOutcome, WorkflowEngine};
pub use error::EngineError;
pub use vars::{InMemoryVariableStore, VariableResolver, VariableSource};
