// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Process startup: configuration, logging, wiring and the HTTP server.

use std::fs::OpenOptions;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::router;
use crate::cache::TransactionCache;
use crate::config::ServiceConfig;
use crate::fetch::FetchOffloader;
use crate::store::PersistentStore;
use crate::upstream::RNodeClient;

/// Main entry point for the application.
pub async fn run() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_path.as_deref())?;
    info!(config = ?config, "Starting blocktx");

    // An unusable store is fatal
    let store = PersistentStore::open(config.store_path.clone(), config.store_max_bytes())
        .context("Failed to open transaction store")?;

    let source = RNodeClient::new(&config.upstream_host, config.upstream_port)
        .context("Invalid upstream address")?
        .with_request_timeout(config.fetch_timeout);
    let offloader = FetchOffloader::new(
        Arc::new(source),
        config.worker_pool_size,
        config.fetch_queue_capacity,
    )
    .with_timeout(config.fetch_timeout);

    let cache = Arc::new(TransactionCache::new(store, offloader));

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;

    let served = serve_api(listener, Arc::clone(&cache), shutdown_signal()).await;
    close_cache(cache).await;
    served
}

/// Starts the API server and runs it until `shutdown` completes.
pub async fn serve_api(
    listener: TcpListener,
    cache: Arc<TransactionCache>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(cache);

    let addr = listener.local_addr()?;

    info!(address = ?addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Installs the global subscriber, writing to stdout or appending to `log_path`.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing(log_path: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

/// How long shutdown waits for fetches of abandoned requests to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Closes the store and the fetch pool off the async runtime.
///
/// LMDB teardown blocks, and the upstream client must not be dropped on a
/// runtime thread, so the last reference is released inside `spawn_blocking`.
async fn close_cache(cache: Arc<TransactionCache>) {
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while Arc::strong_count(&cache) > 1 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if Arc::strong_count(&cache) > 1 {
        warn!("Fetches still running at shutdown");
    }

    let closed = tokio::task::spawn_blocking(move || {
        cache.shutdown();
        drop(cache);
    })
    .await;

    if let Err(e) = closed {
        error!(error = %e, "Cache shutdown failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
