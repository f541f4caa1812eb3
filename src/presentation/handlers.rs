// HTTP request handlers
use crate::application::session::SloSession;
use crate::domain::traffic_light::TrafficLightStatus;
use crate::error::SloError;
use crate::infrastructure::chunked_json::stream_from_watch;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::{AppState, SettingsUpdate};
use crate::presentation::views::{
    report_to_view, settings_to_view, slo_to_view, snapshot_to_view, SloView, SlosResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub max_points: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// Fetch the list from the backend instead of reading the current cycle
    #[serde(default)]
    pub live: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FiltersRequest {
    pub status: Option<String>,
    pub entity_type: Option<String>,
}

fn error_response(err: &SloError) -> Response {
    let status = match err {
        SloError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
        SloError::Transport(_) => StatusCode::BAD_GATEWAY,
        SloError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, status = status.as_u16(), "Request failed");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn respond<T: serde::Serialize>(data: &T, compress: bool) -> Response {
    match json_response(data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current visible SLOs
pub async fn list_slos(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let session = state.session();
    let body = SlosResponse {
        list_status: session.list_status(),
        filters: session.filters(),
        snapshot: snapshot_to_view(&session.snapshot()),
    };
    respond(&body, accepts_brotli(&headers)).await
}

/// Every snapshot as it is published, so rows appear as their reports load
pub async fn stream_slos(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.session().subscribe();
    stream_from_watch(rx, accepts_brotli(&headers), snapshot_to_view)
}

/// All SLOs of the current cycle, unfiltered. With `live=true` the list is
/// fetched from the backend without touching the cycle, for picking a selection
/// before anything was loaded.
pub async fn list_catalog(
    Query(query): Query<CatalogQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = state.session();
    let records = if query.live {
        match session.fetch_catalog().await {
            Ok(records) => records,
            Err(e) => return error_response(&e),
        }
    } else {
        session.all_records()
    };
    let catalog: Vec<SloView> = records.iter().map(slo_to_view).collect();
    respond(&catalog, accepts_brotli(&headers)).await
}

pub async fn status_counts(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session().counts()).into_response()
}

/// Fetch one report with its reconstructed chart
pub async fn get_report(
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = state.session();
    match session.fetch_report(&id).await {
        Ok(report) => {
            let view = report_to_view(&id, &report, session.yellow_threshold(), query.max_points);
            respond(&view, accepts_brotli(&headers)).await
        }
        Err(e) => error_response(&e),
    }
}

pub async fn set_filters(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FiltersRequest>,
) -> Response {
    let status = match request.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => match TrafficLightStatus::parse(value) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("unknown status: {}", value) })),
                )
                    .into_response();
            }
        },
    };

    let snapshot = state.session().set_filters(status, request.entity_type);
    Json(snapshot_to_view(&snapshot)).into_response()
}

pub async fn clear_filters(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.session().clear_filters();
    Json(snapshot_to_view(&snapshot)).into_response()
}

/// Start a new fetch cycle; reports keep arriving after the response
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    match state.session().refresh().await {
        Ok(snapshot) => (StatusCode::ACCEPTED, Json(snapshot_to_view(&snapshot))).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Response {
    Json(settings_to_view(&state.preferences().preferences())).into_response()
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Response {
    match state.apply_settings(update) {
        Ok(applied) => {
            if applied.rebuilt && applied.session.is_configured() {
                spawn_refresh(applied.session);
            }
            Json(settings_to_view(&state.preferences().preferences())).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to apply settings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Validate credentials against the backend
pub async fn version_info(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session();
    if !session.is_configured() {
        return error_response(&SloError::Configuration(
            "API endpoint and token are required".to_string(),
        ));
    }
    match session.version_info().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Refresh in the background, logging failures
pub fn spawn_refresh(session: Arc<SloSession>) {
    tokio::spawn(async move {
        if let Err(e) = session.refresh().await {
            tracing::warn!(error = %e, "Background refresh failed");
        }
    });
}
