// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chowkihub: passage ingestion, pair matching, and violation detection
//! server for two-checkpost highway segments.

pub mod config;
pub mod directory;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod scanner;
pub mod store;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::directory::Directory;
use crate::store::Store;
use crate::transport::{build_router, AppState};

/// Run the server until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let directory = Arc::new(Directory::load(&config.directory)?);
    let store = Arc::new(Store::new(directory));
    let shutdown = CancellationToken::new();

    let _scanner = scanner::spawn(
        Arc::clone(&store),
        config.scan_interval(),
        config.scan_batch_size,
        shutdown.clone(),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { store, config });
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("chowkihub listening on {addr}");

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
