// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `linkflowd` — one execution-core process: a fixed set of shards, their
//! timer scan loops, the configured worker pools, and an HTTP front door for
//! the `linkflow-rpc` surface (§10.2, §10.3).

mod config;
mod effects;
mod error;
mod http;
mod outcome;
mod shard;

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;
    tracing::info!(shard_count = config.shard_count, http_addr = %config.http_addr, "loaded configuration");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let daemon = Arc::new(shard::build(&config, shutdown_rx).await?);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(addr = %config.http_addr, "linkflowd listening");

    let app = http::router(daemon);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    tracing::info!("linkflowd shut down gracefully");
    Ok(())
}

/// Resolves once CTRL-C is received, also flipping the shard timer loops'
/// shutdown watch so they stop scanning before the process exits.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, shutting down"),
        Err(err) => tracing::warn!(%err, "failed to install ctrl-c handler"),
    }
    let _ = shutdown_tx.send(true);
}
