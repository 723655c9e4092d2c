// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! linkflow-timer: the durable Timer Service (§4.C).
//!
//! Owns a per-shard scan loop over a [`TimerStore`](linkflow_storage::TimerStore):
//! at a configurable cadence it fetches due timers, hands each to a
//! [`TimerDeliverer`] (the engine, in production), and transitions the timer
//! to `Fired` once delivery succeeds. A separate purge loop removes old
//! terminal timers.

mod deliver;
mod error;
mod scan;

pub use deliver::{DeliveryError, TimerDeliverer};
pub use error::TimerServiceError;
pub use scan::{ScanConfig, ScanOutcome, TimerService};
