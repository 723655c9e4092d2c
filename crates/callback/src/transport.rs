// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Low-level HTTP delivery (§4.H): "connection pool (50 idle, 20 per host,
//! HTTP/2 attempted), 10s default timeout; non-2xx responses are treated as
//! failure and logged with status + truncated body."
//!
//! `reqwest` exposes per-host idle-pool sizing but no separate total-idle
//! cap, so only `pool_max_idle_per_host` is configured here; HTTP/2 is
//! negotiated automatically over TLS and needs no extra builder call.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CallbackError;

const TRUNCATED_BODY_LEN: usize = 256;

/// Sends a signed callback request. Kept as a trait so notifier retry/queue
/// logic can be tested against a fake without real HTTP I/O.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    async fn send(&self, url: &str, headers: Vec<(String, String)>, body: String) -> Result<(), CallbackError>;
}

pub struct HttpCallbackTransport {
    client: reqwest::Client,
}

impl HttpCallbackTransport {
    pub fn new(timeout: Duration) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(20)
            .timeout(timeout)
            .build()
            .map_err(|err| CallbackError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn send(&self, url: &str, headers: Vec<(String, String)>, body: String) -> Result<(), CallbackError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|err| CallbackError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let truncated: String = body.chars().take(TRUNCATED_BODY_LEN).collect();
        Err(CallbackError::NonSuccessStatus { status: status.as_u16(), body: truncated })
    }
}

/// In-memory [`CallbackTransport`] recording every send, for downstream
/// crates' tests (§10.5: `FakeCallbackTransport`).
#[cfg(any(test, feature = "test-support"))]
pub struct FakeCallbackTransport {
    pub requests: parking_lot::Mutex<Vec<(String, Vec<(String, String)>, String)>>,
    fail_next: parking_lot::Mutex<u32>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeCallbackTransport {
    fn default() -> Self {
        Self { requests: parking_lot::Mutex::new(Vec::new()), fail_next: parking_lot::Mutex::new(0) }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FakeCallbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` sends fail with a transport error before succeeding again.
    pub fn fail_next_n(&self, n: u32) {
        *self.fail_next.lock() = n;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CallbackTransport for FakeCallbackTransport {
    async fn send(&self, url: &str, headers: Vec<(String, String)>, body: String) -> Result<(), CallbackError> {
        self.requests.lock().push((url.to_string(), headers, body));

        let mut fail = self.fail_next.lock();
        if *fail > 0 {
            *fail -= 1;
            return Err(CallbackError::Transport("simulated failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
