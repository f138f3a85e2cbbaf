//! # Dashboard Hub Server
//!
//! Serves the live dashboard: a WebSocket endpoint that receives periodic
//! `dashboard:update` pushes, plus a small JSON control API.
//!
//! ## Core Responsibilities:
//! - **Configuration:** defaults, then `server_dashboard.conf`, then environment / CLI.
//! - **Hub Lifecycle:** builds the `DashboardHub` from settings, starts the heartbeat and
//!   the refresh scheduler, and shuts both down on signal.
//! - **HTTP/WebSocket Surface:** health check, `/ws` upgrade and the `/api/*` routes.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use lib_dashboard::DashboardHub;
use tokio::signal;

mod dashboard_logic;
use dashboard_logic::{config, logger, routes};

/// # Main Entry Point
///
/// ## Execution Flow:
/// 1.  **Environment**: Loads `.env` if present.
/// 2.  **Configuration & Logging**: Merges the config layers and installs the `fern` logger.
/// 3.  **Hub**: Builds the sources and the hub, then starts it. The first refresh runs before
///     the listener opens.
/// 4.  **Serve**: Binds the router and serves until `CTRL+C` or `SIGTERM`.
/// 5.  **Graceful Shutdown**: Stops the scheduler and closes every WebSocket with 1001 so the
///     server can drain.
#[tokio::main]
async fn main() -> Result<()> {
    // --- Phase 1: Environment & Configuration ---
    dotenvy::dotenv().ok();
    let (config, notice) = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;
    if let Some(notice) = notice {
        log::warn!("{}", notice);
    }

    let settings = config.to_hub_settings()?;
    log::info!("Dashboard hub booting.\n{}", settings);

    // --- Phase 2: Core Infrastructure ---
    let hub = Arc::new(DashboardHub::from_settings(&settings).context("Failed to build the data sources")?);
    hub.start().await;

    // --- Phase 3: Router and Server Construction ---
    let app = routes::router(routes::AppState { hub: Arc::clone(&hub) });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Dashboard hub live at http://{} (ws at /ws)", addr);

    // --- Phase 4: Serve until signalled ---
    let shutdown_hub = Arc::clone(&hub);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            log::warn!("Shutdown signal received. Closing connections gracefully...");
            // Open sockets would otherwise keep the graceful shutdown waiting.
            shutdown_hub.shutdown().await;
        })
        .await?;

    log::info!("Shutdown complete.");
    Ok(())
}

/// # Graceful Shutdown Signal Handler
///
/// Resolves on `CTRL+C`, or on `SIGTERM` on UNIX-like systems.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
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
}
