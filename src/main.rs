// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::load_app_config;
use crate::infrastructure::preference_store::FilePreferenceStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::spawn_refresh;
use crate::presentation::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_app_config()?;
    let preferences = Arc::new(
        FilePreferenceStore::open(&config.preferences.path).with_context(|| {
            format!("Failed to load preferences from {}", config.preferences.path.display())
        })?,
    );

    let transport_factory = AppState::instana_transport(&config);
    let state = Arc::new(AppState::new(config.clone(), preferences, transport_factory)?);

    let session = state.session();
    if session.is_configured() {
        if !state.preferences().has_selection() {
            tracing::warn!("No SLOs selected; the visible list stays empty until PUT /settings selects some");
        }
        spawn_refresh(session);
    } else {
        tracing::warn!("API endpoint or token missing; configure them through PUT /settings");
    }

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, fetch_scope = ?config.api.fetch_scope, "Starting slo-monitor");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
