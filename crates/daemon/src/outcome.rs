// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes worker-reported node outcomes back to the owning shard's engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use linkflow_core::ExecutionKey;
use linkflow_worker::NodeOutcomeSink;
use serde_json::Value;
use tracing::warn;

use crate::shard::Engine;

/// Implements [`NodeOutcomeSink`] by dispatching to whichever shard owns the
/// reporting task's `ExecutionKey` (§2: shard routing excludes `run_id`, so
/// the same shard that dispatched the task also owns its completion).
pub struct EngineOutcomeSink {
    shards: Vec<Arc<Engine>>,
    shard_count: u32,
}

impl EngineOutcomeSink {
    pub fn new(shards: Vec<Arc<Engine>>) -> Self {
        let shard_count = shards.len() as u32;
        Self { shards, shard_count }
    }

    fn engine_for(&self, key: &ExecutionKey) -> &Arc<Engine> {
        &self.shards[key.shard_id(self.shard_count) as usize]
    }
}

#[async_trait]
impl NodeOutcomeSink for EngineOutcomeSink {
    async fn complete(&self, key: &ExecutionKey, scheduled_event_id: i64, output: Value) {
        let engine = self.engine_for(key);
        if let Err(err) = engine.complete_activity(key, scheduled_event_id, output, Utc::now()).await {
            warn!(%err, %scheduled_event_id, "complete_activity failed");
        }
    }

    async fn fail(&self, key: &ExecutionKey, scheduled_event_id: i64, message: String) {
        let engine = self.engine_for(key);
        if let Err(err) = engine.fail_activity(key, scheduled_event_id, message, Utc::now()).await {
            warn!(%err, %scheduled_event_id, "fail_activity failed");
        }
    }
}
