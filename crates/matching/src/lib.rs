// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! linkflow-matching: per-`(namespace, task_queue)` priority queues with
//! visibility timeouts, leases, and a two-level token-bucket rate limiter
//! (§4.D).
//!
//! The queue is in-memory: §4.D allows this explicitly ("the in-memory
//! priority queue is an optional mode used only for local DAG execution and
//! may be omitted" against a durable backend). Lease-expiry recovery is
//! handled inline on every poll rather than via a crash-recovery sweep,
//! since there is no process restart to recover from for this backend.

mod error;
mod queue;
mod rate_limit;
mod service;

pub use error::MatchingError;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{FailOutcome, MatchingService, PolledTask};
