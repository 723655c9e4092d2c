// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-executor circuit breaker (§4.G): `Closed -> Open -> HalfOpen -> Closed`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub window: Duration,
    pub min_requests_in_window: u32,
    pub open_timeout: Duration,
    pub half_open_requests: u32,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            min_requests_in_window: 10,
            open_timeout: Duration::from_secs(30),
            half_open_requests: 3,
            success_threshold: 3,
        }
    }
}

/// Returned by [`CircuitBreaker::try_enter`] when the call is rejected without
/// ever reaching the wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenError;

enum Slot {
    Closed,
    HalfOpenProbe,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    window: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    half_open_inflight: u32,
    half_open_successes: u32,
}

/// A single executor's circuit breaker. Closed opens at `failure_threshold`
/// consecutive failures, or at a failure rate above 50% once the window holds
/// at least `min_requests_in_window` samples. Open auto-promotes to HalfOpen
/// after `open_timeout` and admits up to `half_open_requests` concurrent
/// probes; `success_threshold` successes close it again, any failure reopens.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                window: VecDeque::new(),
                opened_at: None,
                half_open_inflight: 0,
                half_open_successes: 0,
            }),
            config,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Runs `f` under the breaker. Rejects with [`CircuitOpenError`] before
    /// ever invoking `f` when the breaker is open (or the half-open probe
    /// budget is exhausted).
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, Result<E, CircuitOpenError>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let slot = self.try_enter().ok_or(Err(CircuitOpenError))?;
        let outcome = f().await;
        self.record(slot, outcome.is_ok());
        outcome.map_err(Ok)
    }

    fn try_enter(&self) -> Option<Slot> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Some(Slot::Closed),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|at| at.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed < self.config.open_timeout {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.half_open_inflight = 1;
                inner.half_open_successes = 0;
                Some(Slot::HalfOpenProbe)
            }
            CircuitState::HalfOpen => {
                if inner.half_open_inflight >= self.config.half_open_requests {
                    return None;
                }
                inner.half_open_inflight += 1;
                Some(Slot::HalfOpenProbe)
            }
        }
    }

    fn record(&self, slot: Slot, success: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if matches!(slot, Slot::HalfOpenProbe) {
            inner.half_open_inflight = inner.half_open_inflight.saturating_sub(1);
        }

        match inner.state {
            CircuitState::HalfOpen => {
                if success {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.success_threshold {
                        inner.state = CircuitState::Closed;
                        inner.consecutive_failures = 0;
                        inner.window.clear();
                        inner.opened_at = None;
                    }
                } else {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    inner.half_open_inflight = 0;
                    inner.half_open_successes = 0;
                }
            }
            CircuitState::Closed => {
                inner.window.push_back((now, success));
                prune_window(&mut inner.window, self.config.window, now);

                if success {
                    inner.consecutive_failures = 0;
                    return;
                }

                inner.consecutive_failures += 1;
                let total = inner.window.len() as u32;
                let failures = inner.window.iter().filter(|(_, ok)| !ok).count() as u32;
                let rate_tripped =
                    total >= self.config.min_requests_in_window && failures * 2 > total;

                if inner.consecutive_failures >= self.config.failure_threshold || rate_tripped {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                }
            }
            CircuitState::Open => {
                // A call that started before the Open->HalfOpen transition
                // raced in; nothing to update, the breaker is already open.
            }
        }
    }
}

fn prune_window(window: &mut VecDeque<(Instant, bool)>, span: Duration, now: Instant) {
    while let Some((at, _)) = window.front() {
        if now.duration_since(*at) > span {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "circuit_breaker_tests.rs"]
mod tests;
