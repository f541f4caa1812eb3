// Presentation layer - HTTP API
pub mod app_state;
pub mod handlers;
pub mod views;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_filters, get_report, get_settings, health_check, list_catalog, list_slos, refresh,
    set_filters, status_counts, stream_slos, update_settings, version_info,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is handled in the response builders, so no CompressionLayer here
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/slos", get(list_slos))
        .route("/slos/stream", get(stream_slos))
        .route("/slos/catalog", get(list_catalog))
        .route("/slos/counts", get(status_counts))
        .route("/slos/:id/report", get(get_report))
        .route("/filters", put(set_filters).delete(clear_filters))
        .route("/refresh", post(refresh))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/version", get(version_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
