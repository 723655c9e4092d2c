// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use linkflow_core::Timer;
use thiserror::Error;

/// Delivery failed; the timer is left `Pending` and retried on the next scan.
#[derive(Debug, Error)]
#[error("timer delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// The engine-side hook a fired timer is handed to (§4.C: "delivered to the
/// Engine which writes a `TimerFired` event"). Implemented by `linkflow-engine`;
/// kept as a trait here so the scan loop has no dependency on the engine crate.
#[async_trait]
pub trait TimerDeliverer: Send + Sync {
    async fn deliver(&self, timer: &Timer) -> Result<(), DeliveryError>;
}
