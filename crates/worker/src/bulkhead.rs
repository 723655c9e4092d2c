// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded concurrency guard (§4.G): `Acquire` blocks up to a max wait or
//! returns `Rejected`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bulkhead rejected: no capacity within the max wait")]
pub struct Rejected;

/// A bounded semaphore shared by every in-flight execution on a host (or, via
/// [`BulkheadRegistry`], scoped to a single executor).
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    max_wait: Duration,
}

impl Bulkhead {
    pub fn new(capacity: usize, max_wait: Duration) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(capacity)), max_wait }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, Rejected> {
        match tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore is never closed, so `acquire_owned` cannot fail;
            // only the timeout branch is reachable in practice.
            Ok(Err(_)) | Err(_) => Err(Rejected),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[path = "bulkhead_tests.rs"]
mod tests;
