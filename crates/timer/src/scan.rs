// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-shard scan loop (§4.C).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use linkflow_core::{ExecutionKey, TimerStatus};
use linkflow_storage::TimerStore;
use tracing::{info, warn};

use crate::deliver::TimerDeliverer;
use crate::error::TimerServiceError;

/// Tunables for a shard's scan/purge cadence. Defaults match §4.C/§6.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// How often the due-timer scan runs. Default 1s.
    pub scan_interval: Duration,
    /// Max timers fetched per scan pass. Default 100.
    pub scan_batch: usize,
    /// How often the terminal-timer purge runs. Default 1h.
    pub purge_interval: Duration,
    /// Terminal timers older than this are purged. Default 24h.
    pub purge_retention: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(1),
            scan_batch: 100,
            purge_interval: Duration::from_secs(3600),
            purge_retention: Duration::from_secs(24 * 3600),
        }
    }
}

/// Result of a single scan pass, returned from [`TimerService::scan_once`]
/// for testability without a ticker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Owns one shard's due-timer scan and purge loops.
pub struct TimerService<S, D> {
    shard_id: u32,
    store: Arc<S>,
    deliverer: Arc<D>,
    config: ScanConfig,
}

impl<S, D> TimerService<S, D>
where
    S: TimerStore + 'static,
    D: TimerDeliverer + 'static,
{
    pub fn new(shard_id: u32, store: Arc<S>, deliverer: Arc<D>, config: ScanConfig) -> Self {
        Self { shard_id, store, deliverer, config }
    }

    /// Fetch due timers and attempt delivery for each. A timer whose delivery
    /// fails is left `Pending` (I4: picked up again on a later scan within
    /// the shard's cadence); a timer whose store update loses the optimistic
    /// race (concurrent cancellation) is skipped without error.
    pub async fn scan_once(&self) -> Result<ScanOutcome, TimerServiceError> {
        let now = Utc::now();
        let due = self.store.fetch_due(self.shard_id, now, self.config.scan_batch).await?;
        let mut outcome = ScanOutcome { fetched: due.len(), ..Default::default() };

        for timer in due {
            match self.deliverer.deliver(&timer).await {
                Ok(()) => {
                    let key = ExecutionKey::new(
                        timer.namespace_id.clone(),
                        timer.workflow_id.clone(),
                        timer.run_id.clone(),
                    );
                    match self
                        .store
                        .update_status(&key, &timer.timer_id, TimerStatus::Fired, Some(now), timer.version)
                        .await
                    {
                        Ok(()) => outcome.delivered += 1,
                        Err(err) => {
                            warn!(%err, timer_id = %timer.timer_id, "timer fired but status update lost the race");
                        }
                    }
                }
                Err(err) => {
                    outcome.failed += 1;
                    warn!(%err, timer_id = %timer.timer_id, "timer delivery failed, left pending for retry");
                }
            }
        }

        Ok(outcome)
    }

    /// Purge terminal timers older than `purge_retention`.
    pub async fn purge_once(&self) -> Result<u64, TimerServiceError> {
        let cutoff = Utc::now() - self.config.purge_retention;
        Ok(self.store.purge_terminal_before(self.shard_id, cutoff).await?)
    }

    /// Run the scan and purge loops until `shutdown` resolves. Each loop is
    /// an independent `tokio::time::interval` ticker (§5: "Timer scan
    /// (ticker-driven)").
    pub async fn run_until(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let scan_self = Arc::clone(&self);
        let mut scan_shutdown = shutdown.clone();
        let scan_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scan_self.config.scan_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = scan_self.scan_once().await {
                            warn!(%err, shard_id = scan_self.shard_id, "timer scan pass failed");
                        }
                    }
                    _ = scan_shutdown.changed() => {
                        if *scan_shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        let purge_self = Arc::clone(&self);
        let purge_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(purge_self.config.purge_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match purge_self.purge_once().await {
                            Ok(count) if count > 0 => {
                                info!(count, shard_id = purge_self.shard_id, "purged terminal timers");
                            }
                            Ok(_) => {}
                            Err(err) => warn!(%err, shard_id = purge_self.shard_id, "timer purge pass failed"),
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        let _ = tokio::join!(scan_task, purge_task);
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
