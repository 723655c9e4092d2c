// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (§10.4): layered defaults -> config file -> environment,
//! using the `config` crate.

use serde::Deserialize;

use linkflow_matching::RateLimitConfig;
use linkflow_worker::{CircuitBreakerConfig as WorkerCircuitBreakerConfig, WorkerConfig};

/// Top-level daemon configuration, covering every item in the configuration
/// surface: sharding, the callback control-plane target, rate limiting,
/// worker resilience thresholds, and timer scan cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of shards the execution key space is partitioned into.
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,

    /// Soft cap on a single run's history length before a caller should
    /// continue-as-new; advisory only, not enforced by the storage layer.
    #[serde(default = "default_stream_maxlen")]
    pub stream_maxlen: i64,

    /// Whether `ExecutionContext::credentials` carries decrypted material
    /// rather than an opaque reference handle.
    #[serde(default)]
    pub send_sensitive_context: bool,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub matching: MatchingSection,

    #[serde(default)]
    pub breaker: BreakerSection,

    #[serde(default)]
    pub bulkhead: BulkheadSection,

    #[serde(default)]
    pub timer: TimerSection,

    /// The fixed set of `(namespace, task_queue)` pairs this daemon runs a
    /// worker pool against. There is no node-type catalog to discover this
    /// set dynamically from workflow definitions, so it is configured.
    #[serde(default)]
    pub worker_queues: Vec<WorkerQueueConfig>,

    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_shard_count() -> u32 {
    16
}

fn default_stream_maxlen() -> i64 {
    50_000
}

fn default_http_addr() -> String {
    "0.0.0.0:7700".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            stream_maxlen: default_stream_maxlen(),
            send_sensitive_context: false,
            engine: EngineSection::default(),
            matching: MatchingSection::default(),
            breaker: BreakerSection::default(),
            bulkhead: BulkheadSection::default(),
            timer: TimerSection::default(),
            worker_queues: Vec::new(),
            http_addr: default_http_addr(),
        }
    }
}

/// Control-plane callback target (§4.H).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Where lifecycle notifications are POSTed.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// HMAC shared secret; notifications are sent unsigned when unset.
    #[serde(default)]
    pub callback_secret: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080/callbacks".to_string()
}

impl Default for EngineSection {
    fn default() -> Self {
        Self { api_url: default_api_url(), callback_secret: None }
    }
}

/// Token-bucket rate limiting (§4.D).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MatchingSection {
    #[serde(default = "default_global_rps")]
    pub global_rps: f64,
    #[serde(default = "default_global_burst")]
    pub global_burst: f64,
    #[serde(default = "default_namespace_rps")]
    pub namespace_rps: f64,
    #[serde(default = "default_namespace_burst")]
    pub namespace_burst: f64,
}

fn default_global_rps() -> f64 {
    RateLimitConfig::default_global().rps
}

fn default_global_burst() -> f64 {
    RateLimitConfig::default_global().burst
}

fn default_namespace_rps() -> f64 {
    RateLimitConfig::default_namespace().rps
}

fn default_namespace_burst() -> f64 {
    RateLimitConfig::default_namespace().burst
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            global_rps: default_global_rps(),
            global_burst: default_global_burst(),
            namespace_rps: default_namespace_rps(),
            namespace_burst: default_namespace_burst(),
        }
    }
}

impl MatchingSection {
    pub fn global(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.global_rps, self.global_burst)
    }

    pub fn namespace_defaults(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.namespace_rps, self.namespace_burst)
    }
}

/// Per-executor circuit breaker thresholds (§4.G).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BreakerSection {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_min_requests_in_window")]
    pub min_requests_in_window: u32,
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
    #[serde(default = "default_half_open_requests")]
    pub half_open_requests: u32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    WorkerCircuitBreakerConfig::default().failure_threshold
}

fn default_window_secs() -> u64 {
    WorkerCircuitBreakerConfig::default().window.as_secs()
}

fn default_min_requests_in_window() -> u32 {
    WorkerCircuitBreakerConfig::default().min_requests_in_window
}

fn default_open_timeout_secs() -> u64 {
    WorkerCircuitBreakerConfig::default().open_timeout.as_secs()
}

fn default_half_open_requests() -> u32 {
    WorkerCircuitBreakerConfig::default().half_open_requests
}

fn default_success_threshold() -> u32 {
    WorkerCircuitBreakerConfig::default().success_threshold
}

impl Default for BreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_secs: default_window_secs(),
            min_requests_in_window: default_min_requests_in_window(),
            open_timeout_secs: default_open_timeout_secs(),
            half_open_requests: default_half_open_requests(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl BreakerSection {
    pub fn to_breaker_config(self) -> WorkerCircuitBreakerConfig {
        WorkerCircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            window: std::time::Duration::from_secs(self.window_secs),
            min_requests_in_window: self.min_requests_in_window,
            open_timeout: std::time::Duration::from_secs(self.open_timeout_secs),
            half_open_requests: self.half_open_requests,
            success_threshold: self.success_threshold,
        }
    }
}

/// Host-level worker-pool bulkhead (§4.G).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BulkheadSection {
    #[serde(default = "default_bulkhead_capacity")]
    pub capacity: usize,
    #[serde(default = "default_bulkhead_max_wait_ms")]
    pub max_wait_ms: u64,
}

fn default_bulkhead_capacity() -> usize {
    16
}

fn default_bulkhead_max_wait_ms() -> u64 {
    1000
}

impl Default for BulkheadSection {
    fn default() -> Self {
        Self { capacity: default_bulkhead_capacity(), max_wait_ms: default_bulkhead_max_wait_ms() }
    }
}

/// Timer scan cadence (§4.C).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimerSection {
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_scan_batch")]
    pub scan_batch: usize,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    #[serde(default = "default_purge_retention_secs")]
    pub purge_retention_secs: u64,
}

fn default_scan_interval_secs() -> u64 {
    1
}

fn default_scan_batch() -> usize {
    100
}

fn default_purge_interval_secs() -> u64 {
    3600
}

fn default_purge_retention_secs() -> u64 {
    24 * 3600
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            scan_batch: default_scan_batch(),
            purge_interval_secs: default_purge_interval_secs(),
            purge_retention_secs: default_purge_retention_secs(),
        }
    }
}

impl TimerSection {
    pub fn to_scan_config(self) -> linkflow_timer::ScanConfig {
        linkflow_timer::ScanConfig {
            scan_interval: std::time::Duration::from_secs(self.scan_interval_secs),
            scan_batch: self.scan_batch,
            purge_interval: std::time::Duration::from_secs(self.purge_interval_secs),
            purge_retention: std::time::Duration::from_secs(self.purge_retention_secs),
        }
    }
}

/// One `(namespace, task_queue)` pair this daemon should run workers
/// against, with a worker count override.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerQueueConfig {
    pub namespace: String,
    pub task_queue: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_worker_count() -> usize {
    4
}

impl WorkerQueueConfig {
    pub fn to_worker_config(&self, breaker: WorkerCircuitBreakerConfig, bulkhead: BulkheadSection) -> WorkerConfig {
        let mut config = WorkerConfig::new(self.namespace.clone(), linkflow_core::TaskQueueName::new(&self.task_queue));
        config.worker_count = self.worker_count;
        config.breaker = breaker;
        config.bulkhead_capacity = bulkhead.capacity;
        config.bulkhead_max_wait = std::time::Duration::from_millis(bulkhead.max_wait_ms);
        config
    }
}

impl Config {
    /// Loads defaults, then `linkflow.toml` (if present), then environment
    /// variables prefixed `LINKFLOW__` with `__` as the nesting separator,
    /// e.g. `LINKFLOW__MATCHING__GLOBAL_RPS=500`.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name("linkflow").required(false))
            .add_source(config::Environment::with_prefix("LINKFLOW").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

impl serde::Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Config", 8)?;
        s.serialize_field("shard_count", &self.shard_count)?;
        s.serialize_field("stream_maxlen", &self.stream_maxlen)?;
        s.serialize_field("send_sensitive_context", &self.send_sensitive_context)?;
        s.serialize_field("http_addr", &self.http_addr)?;
        s.end()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
