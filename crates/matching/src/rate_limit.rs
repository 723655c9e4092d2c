// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-level token-bucket rate limiting (§4.D, §5: "single reader/writer
//! lock each, with double-checked lazy insertion for registries").

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;

/// Token-bucket configuration: steady-state rate plus burst capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub rps: f64,
    pub burst: f64,
}

impl RateLimitConfig {
    pub fn new(rps: f64, burst: f64) -> Self {
        Self { rps, burst }
    }

    /// Global default: 1000 rps, burst 2000 (§4.D).
    pub fn default_global() -> Self {
        Self::new(1000.0, 2000.0)
    }

    /// Per-namespace default: 100 rps, burst 200 (§4.D).
    pub fn default_namespace() -> Self {
        Self::new(100.0, 200.0)
    }
}

struct TokenBucket {
    config: RateLimitConfig,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(config: RateLimitConfig) -> Self {
        Self { tokens: config.burst, last_refill: Instant::now(), config }
    }

    fn try_consume(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.config.rps).min(self.config.burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Two-level limiter: a global bucket plus one per-namespace bucket, both
/// consulted for every `Enqueue`/`PollOne`; denial of either denies the call
/// without side effect (§4.D).
pub struct RateLimiter {
    global: RwLock<TokenBucket>,
    namespace_defaults: RateLimitConfig,
    namespaces: RwLock<HashMap<String, TokenBucket>>,
    overrides: RwLock<HashMap<String, RateLimitConfig>>,
}

impl RateLimiter {
    pub fn new(global: RateLimitConfig, namespace_defaults: RateLimitConfig) -> Self {
        Self {
            global: RwLock::new(TokenBucket::new(global)),
            namespace_defaults,
            namespaces: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Set a custom limit for a namespace, replacing its bucket so the new
    /// burst/rps takes effect immediately.
    pub fn set_namespace_limit(&self, namespace: &str, config: RateLimitConfig) {
        self.overrides.write().insert(namespace.to_string(), config);
        self.namespaces.write().insert(namespace.to_string(), TokenBucket::new(config));
    }

    /// Remove a custom limit, reverting the namespace to the shared default
    /// on its next access.
    pub fn remove_namespace_limit(&self, namespace: &str) {
        self.overrides.write().remove(namespace);
        self.namespaces.write().remove(namespace);
    }

    /// Consult and consume one token from both the global and the
    /// namespace-scoped bucket. Returns `true` only if both allow the call.
    pub fn check_and_consume(&self, namespace: &str) -> bool {
        if !self.global.write().try_consume() {
            return false;
        }

        let allowed = {
            let mut namespaces = self.namespaces.write();
            let config = self.overrides.read().get(namespace).copied().unwrap_or(self.namespace_defaults);
            namespaces.entry(namespace.to_string()).or_insert_with(|| TokenBucket::new(config)).try_consume()
        };
        allowed
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default_global(), RateLimitConfig::default_namespace())
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
