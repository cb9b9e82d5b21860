//! Arena Game Server - authoritative real-time simulation for a browser
//! platform shooter
//!
//! One process hosts one arena. Every WebSocket is a player; the arena task
//! owns the world and advances it at a fixed tick rate.

mod app;
mod config;
mod game;
mod http;
mod util;
mod ws;

use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::AppState;
use crate::config::{Config, LogFormat};
use crate::http::build_router;
use crate::util::time::init_server_time;

/// How long the arena may take to wind down once the listener is closed
const ARENA_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    init_tracing(&config.log_level, config.log_format);
    init_server_time();

    info!(
        addr = %config.server_addr,
        tick_rate = config.world.tick_rate,
        platforms = config.world.platforms.len(),
        "Starting Arena Game Server"
    );

    let addr = config.server_addr;
    let (state, arena) = AppState::new(config);
    let arena_task = tokio::spawn(arena.run());

    let listener = TcpListener::bind(addr).await?;
    info!(
        health = %format!("http://{addr}/health"),
        ws = %format!("ws://{addr}/ws"),
        "Listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last long-lived command sender; the arena loop ends
    // once open sessions have sent their disconnects
    match tokio::time::timeout(ARENA_DRAIN_TIMEOUT, arena_task).await {
        Ok(Ok(())) => info!("Arena drained"),
        Ok(Err(e)) => error!(error = %e, "Arena task failed"),
        Err(_) => warn!("Arena still running at exit, sessions left open"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL` when both are set
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry.with(fmt_layer).init(),
        LogFormat::Json => registry.with(fmt_layer.json()).init(),
    }
}

/// Resolves on Ctrl+C or SIGTERM. A signal source that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
