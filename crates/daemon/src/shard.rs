// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires one shard's storage, engine, and timer scan loop together, and
//! builds the fixed set of shards plus the process-wide singletons
//! (Matching, the callback notifier) this daemon runs (§2, §5).

use std::sync::Arc;
use std::time::Duration;

use linkflow_callback::{CallbackConfig, CallbackNotifier, HttpCallbackTransport};
use linkflow_engine::{EngineConfig, InMemoryVariableStore, VariableResolver, WorkflowEngine};
use linkflow_matching::{MatchingService, RateLimiter};
use linkflow_storage::{
    ChecksumMode, InMemoryEventStore, InMemoryMutableStateStore, InMemoryTimerStore,
    InMemoryVisibilityStore,
};
use linkflow_timer::{ScanConfig, TimerService};
use linkflow_worker::{ExecutorRegistry, NoCredentials, WorkerPool};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::effects::{MatchingActivityScheduler, NotifierCallbackSink, StoreTimerScheduler};
use crate::outcome::EngineOutcomeSink;

/// Concrete engine instantiation this daemon runs: in-memory storage,
/// Matching-backed activity dispatch, store-backed durable timers, and an
/// HTTP-delivered, HMAC-signed callback notifier (§9: "an in-memory mode is
/// legitimate for local DAG execution").
pub type Engine = WorkflowEngine<
    InMemoryEventStore,
    InMemoryMutableStateStore,
    InMemoryVisibilityStore,
    MatchingActivityScheduler,
    StoreTimerScheduler<InMemoryTimerStore>,
    NotifierCallbackSink<HttpCallbackTransport>,
>;

/// One shard's bundle of storage handles and its engine.
pub struct ShardHandle {
    pub shard_id: u32,
    pub engine: Arc<Engine>,
    pub events: Arc<InMemoryEventStore>,
    pub state: Arc<InMemoryMutableStateStore>,
    pub visibility: Arc<InMemoryVisibilityStore>,
    pub timer_store: Arc<InMemoryTimerStore>,
}

/// Everything this daemon process runs: the shard bundles, the worker pools
/// reading from each configured task queue, and background task handles kept
/// alive for graceful shutdown.
pub struct Daemon {
    pub shards: Vec<Arc<ShardHandle>>,
    pub shard_count: u32,
    pub matching: Arc<MatchingService>,
    pub visibility: Arc<InMemoryVisibilityStore>,
    _background: Vec<JoinHandle<()>>,
}

impl Daemon {
    pub fn engine_for(&self, shard_id: u32) -> Arc<Engine> {
        self.shards[shard_id as usize].engine.clone()
    }

    pub fn shard_for(&self, key: &linkflow_core::ExecutionKey) -> &Arc<ShardHandle> {
        &self.shards[key.shard_id(self.shard_count) as usize]
    }
}

/// Builds the full shard set plus worker pools per `config.worker_queues`,
/// and spawns every background driver (`TimerService::run_until`,
/// `WorkerPool::spawn`).
pub async fn build(config: &Config, shutdown: watch::Receiver<bool>) -> anyhow::Result<Daemon> {
    let matching = Arc::new(MatchingService::new(RateLimiter::new(
        config.matching.global(),
        config.matching.namespace_defaults(),
    )));

    let callback_transport = Arc::new(HttpCallbackTransport::new(Duration::from_secs(10))?);
    let callback_config = CallbackConfig {
        callback_secret: config.engine.callback_secret.clone(),
        ..CallbackConfig::default()
    };
    let notifier =
        Arc::new(CallbackNotifier::new(callback_transport, config.engine.api_url.clone(), callback_config));
    let callback_sink = Arc::new(NotifierCallbackSink::new(notifier));

    let scan_config: ScanConfig = config.timer.to_scan_config();
    let engine_config = EngineConfig { shard_count: config.shard_count, ..EngineConfig::default() };

    // Visibility is a single cross-shard index, not partitioned per shard:
    // listing a namespace's executions has no shard dimension in its API
    // (§4.I), so every shard's engine writes into the same instance.
    let visibility = InMemoryVisibilityStore::new();

    let mut shards = Vec::with_capacity(config.shard_count as usize);
    let mut background = Vec::new();

    for shard_id in 0..config.shard_count {
        let events = InMemoryEventStore::new();
        let state = InMemoryMutableStateStore::new(ChecksumMode::Strict);
        let timer_store = InMemoryTimerStore::new();

        let activity_scheduler = Arc::new(MatchingActivityScheduler::new(matching.clone()));
        let timer_scheduler = Arc::new(StoreTimerScheduler::new(timer_store.clone()));

        let engine = Arc::new(Engine::new(
            events.clone(),
            state.clone(),
            visibility.clone(),
            activity_scheduler,
            timer_scheduler,
            callback_sink.clone(),
            engine_config.clone(),
        ));

        let timer_service = Arc::new(TimerService::new(shard_id, timer_store.clone(), engine.clone(), scan_config));
        background.push(tokio::spawn(timer_service.run_until(shutdown.clone())));

        shards.push(Arc::new(ShardHandle {
            shard_id,
            engine,
            events,
            state,
            visibility: visibility.clone(),
            timer_store,
        }));
    }

    let engines: Vec<Arc<Engine>> = shards.iter().map(|s| s.engine.clone()).collect();
    let outcomes = Arc::new(EngineOutcomeSink::new(engines));
    let registry = Arc::new(ExecutorRegistry::new());
    let resolver = Arc::new(VariableResolver::new(InMemoryVariableStore::new()));
    let credentials = Arc::new(NoCredentials);

    for queue in &config.worker_queues {
        let worker_config = queue.to_worker_config(config.breaker.to_breaker_config(), config.bulkhead);
        let pool = Arc::new(WorkerPool::new(
            matching.clone(),
            registry.clone(),
            resolver.clone(),
            credentials.clone(),
            outcomes.clone(),
            worker_config,
        ));
        background.extend(pool.spawn());
    }

    Ok(Daemon { shards, shard_count: config.shard_count, matching, visibility, _background: background })
}
