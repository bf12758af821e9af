//! `sanvia`: cached music-catalog HTTP service.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables (and `.env`).
//! 2. Initialise telemetry (JSON logs, optional OTLP traces).
//! 3. Build the provider client, mirror stores, and dataset slots.
//! 4. Start the scheduler thread with every refresh task and wait until it
//!    accepts bridged work.
//! 5. Build the Axum router and serve until Ctrl-C.
//! 6. Cancel the scheduler and wait for it to stop.

mod bridge;
mod cache;
mod catalog;
mod config;
mod provider;
mod scheduler;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge::RequestBridge;
use cache::Slots;
use config::Config;
use provider::{saavn::SaavnClient, CatalogProvider};
use scheduler::Scheduler;
use server::state::{AppState, SearchSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        store = ?cfg.remote_store,
        "sanvia starting"
    );

    // -----------------------------------------------------------------------
    // 3. Provider, stores, slots
    // -----------------------------------------------------------------------
    let provider: Arc<dyn CatalogProvider> =
        Arc::new(SaavnClient::new(cfg.provider_base_url.clone(), cfg.provider_timeout())?);
    let slots = Slots::new();
    let bridge = RequestBridge::new();

    // -----------------------------------------------------------------------
    // 4. Scheduler context
    // -----------------------------------------------------------------------
    let tasks = scheduler::pipelines::all(&cfg, &slots, store::from_config(&cfg)?)?;
    let scheduler = Scheduler::new(provider, bridge.clone()).with_tasks(tasks);
    let task_statuses = scheduler.task_statuses();

    let shutdown = CancellationToken::new();
    let mut scheduler = scheduler.start(shutdown.clone())?;
    scheduler.ready().await?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let http = reqwest::Client::builder()
        .connect_timeout(cfg.provider_timeout())
        .build()
        .context("building media download client")?;
    let state = AppState::new(
        slots,
        store::from_config(&cfg)?,
        bridge,
        task_statuses,
        SearchSettings::from_config(&cfg),
        http,
    );
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // -----------------------------------------------------------------------
    // 6. Shutdown
    // -----------------------------------------------------------------------
    shutdown.cancel();
    tokio::task::spawn_blocking(move || scheduler.join()).await??;
    info!("sanvia stopped");
    telemetry::shutdown_telemetry();

    Ok(())
}

/// Resolve on Ctrl-C, or when something else cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
