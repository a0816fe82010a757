//! atelier console server entry point.
//!
//! Initialises tracing, loads configuration from environment variables
//! (prefixed with `ATELIER_CONSOLE_`), and serves the read-only workspace
//! API over the store directory the CLI writes.

mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

// ===================================================================
// Configuration
// ===================================================================

/// Server configuration loaded from environment variables via `envy`.
///
/// Each field maps to `ATELIER_CONSOLE_<FIELD>`:
///   - `ATELIER_CONSOLE_LISTEN_ADDR`     (default `127.0.0.1:7080`)
///   - `ATELIER_CONSOLE_WORKSPACES_DIR`  (default `~/.atelier/workspaces`,
///     honoring `ATELIER_HOME`)
#[derive(Debug, Deserialize)]
struct Config {
    /// Socket address to bind the HTTP server to.
    #[serde(default = "default_listen_addr")]
    listen_addr: String,

    /// Directory holding the workspace record files.
    workspaces_dir: Option<PathBuf>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:7080".to_string()
}

fn default_workspaces_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("ATELIER_HOME") {
        return Ok(PathBuf::from(val).join("workspaces"));
    }
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".atelier").join("workspaces"))
}

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("atelier-console starting");

    let config: Config = envy::prefixed("ATELIER_CONSOLE_")
        .from_env()
        .context("failed to load config from ATELIER_CONSOLE_* env vars")?;

    let workspaces_dir = match config.workspaces_dir {
        Some(dir) => dir,
        None => default_workspaces_dir()?,
    };

    tracing::info!(
        listen_addr = %config.listen_addr,
        workspaces_dir = %workspaces_dir.display(),
        "configuration loaded",
    );

    let state = Arc::new(AppState::new(workspaces_dir));
    let router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("failed to bind TCP listener")?;

    tracing::info!("console ready — http://{}/v1/workspaces", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("atelier-console shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl-C handler");
    tracing::info!("received shutdown signal");
}
