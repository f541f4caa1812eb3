// Traffic light classification for SLO health
use serde::{Deserialize, Serialize};

pub const DEFAULT_YELLOW_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrafficLightStatus {
    Green,
    Yellow,
    Red,
}

impl TrafficLightStatus {
    pub const ALL: [TrafficLightStatus; 3] = [Self::Green, Self::Yellow, Self::Red];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Green => "Healthy",
            Self::Yellow => "Warning",
            Self::Red => "Critical",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }

    /// Parse a status name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Classify an SLO by strict priority:
/// 1. RED when the SLI does not exceed the target
/// 2. YELLOW when the remaining error budget is at or below the threshold
/// 3. GREEN otherwise
pub fn classify(
    sli: f64,
    slo_target: f64,
    error_budget_remaining: f64,
    total_error_budget: f64,
    yellow_threshold: f64,
) -> TrafficLightStatus {
    if sli <= slo_target {
        return TrafficLightStatus::Red;
    }

    let remaining_pct = if total_error_budget > 0.0 {
        (error_budget_remaining / total_error_budget) * 100.0
    } else {
        0.0
    };

    if remaining_pct <= yellow_threshold {
        TrafficLightStatus::Yellow
    } else {
        TrafficLightStatus::Green
    }
}

/// Human readable one-line summary of a classification
pub fn describe(
    status: Option<TrafficLightStatus>,
    sli: f64,
    slo_target: f64,
    remaining_pct: f64,
) -> String {
    match status {
        Some(TrafficLightStatus::Green) => format!(
            "Healthy - SLI: {:.2}% (Target: {:.2}%), Error Budget: {:.1}% remaining",
            sli * 100.0,
            slo_target * 100.0,
            remaining_pct
        ),
        Some(TrafficLightStatus::Yellow) => format!(
            "Warning - Error budget low: {:.1}% remaining (SLI: {:.2}%)",
            remaining_pct,
            sli * 100.0
        ),
        Some(TrafficLightStatus::Red) => format!(
            "Critical - SLO not met: SLI {:.2}% below target {:.2}%",
            sli * 100.0,
            slo_target * 100.0
        ),
        None => "Unknown status".to_string(),
    }
}
