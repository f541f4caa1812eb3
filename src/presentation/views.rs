// Mapper to convert domain models to API views
use crate::application::filter_engine::{FilterState, VisibleSnapshot};
use crate::application::session::ListStatus;
use crate::domain::report::{SloReport, TimeWindow};
use crate::domain::slo::{LoadingState, Slo};
use crate::domain::time_series::{downsample, TimeSeriesPoint};
use crate::domain::traffic_light::{describe, TrafficLightStatus};
use crate::infrastructure::preference_store::Preferences;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SloView {
    pub id: String,
    pub name: String,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub loading_state: LoadingState,
    pub status: &'static str,
    pub status_name: Option<&'static str>,
    pub description: String,
    pub sli: Option<f64>,
    pub slo_target: Option<f64>,
    pub error_budget_remaining_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub epoch: u64,
    pub is_loading: bool,
    pub computed_at: DateTime<Utc>,
    pub slos: Vec<SloView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlosResponse {
    pub list_status: ListStatus,
    pub filters: FilterState,
    #[serde(flatten)]
    pub snapshot: SnapshotView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowView {
    pub size: String,
    pub kind: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub id: String,
    pub status: Option<TrafficLightStatus>,
    pub summary: String,
    pub sli: Option<f64>,
    pub slo_target: Option<f64>,
    pub error_budget_remaining_percentage: f64,
    pub error_budget_consumed_percentage: f64,
    pub time_window: Option<TimeWindowView>,
    pub chart: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub api_endpoint: String,
    /// The token itself is never echoed back
    pub api_token_set: bool,
    pub yellow_threshold: f64,
    pub selected_slo_ids: BTreeSet<String>,
}

pub fn slo_to_view(slo: &Slo) -> SloView {
    let report = slo.report();
    let remaining = report
        .filter(|r| r.total_error_budget.is_some_and(|t| t > 0.0))
        .map(SloReport::error_budget_remaining_percentage);

    let description = match report {
        Some(r) => describe(
            slo.status(),
            r.sli.unwrap_or_default(),
            r.slo_target.unwrap_or_default(),
            r.error_budget_remaining_percentage(),
        ),
        None => match slo.loading_state() {
            LoadingState::Failed => "Failed to load report".to_string(),
            LoadingState::Loading => "Loading".to_string(),
            _ => "Not loaded".to_string(),
        },
    };

    SloView {
        id: slo.id().to_string(),
        name: slo.name().to_string(),
        entity_type: slo.entity_type().as_str(),
        entity_id: slo.entity().and_then(|e| e.entity_id()).map(str::to_string),
        loading_state: slo.loading_state(),
        status: slo.status_label(),
        status_name: slo.status().map(|s| s.display_name()),
        description,
        sli: report.and_then(|r| r.sli),
        slo_target: report.and_then(|r| r.slo_target),
        error_budget_remaining_percentage: remaining,
    }
}

pub fn snapshot_to_view(snapshot: &VisibleSnapshot) -> SnapshotView {
    SnapshotView {
        epoch: snapshot.epoch,
        is_loading: snapshot.is_loading,
        computed_at: snapshot.computed_at,
        slos: snapshot.slos.iter().map(slo_to_view).collect(),
    }
}

fn time_window_to_view(window: &TimeWindow) -> TimeWindowView {
    TimeWindowView {
        size: window.formatted_size(),
        kind: window.formatted_type(),
        timezone: window.timezone.clone(),
    }
}

pub fn report_to_view(
    id: &str,
    report: &SloReport,
    yellow_threshold: f64,
    max_points: Option<usize>,
) -> ReportView {
    let points = report.chart_points();
    let chart = match max_points {
        Some(max) if max > 0 => downsample(points, max),
        _ => points,
    };

    ReportView {
        id: id.to_string(),
        status: report.classify(yellow_threshold),
        summary: report.summary(yellow_threshold),
        sli: report.sli,
        slo_target: report.slo_target,
        error_budget_remaining_percentage: report.error_budget_remaining_percentage(),
        error_budget_consumed_percentage: report.error_budget_consumed_percentage(),
        time_window: report.time_window.as_ref().map(time_window_to_view),
        chart,
    }
}

pub fn settings_to_view(preferences: &Preferences) -> SettingsView {
    SettingsView {
        api_endpoint: preferences.api_endpoint.clone(),
        api_token_set: !preferences.api_token.is_empty(),
        yellow_threshold: preferences.yellow_threshold,
        selected_slo_ids: preferences.selected_slo_ids.clone(),
    }
}
