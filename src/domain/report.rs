// SLO report domain model
use super::time_series::{self, TimeSeriesPoint};
use super::traffic_light::{self, TrafficLightStatus};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Detailed SLO metrics. `sli` and `slo_target` are fractions in [0, 1],
/// not percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloReport {
    #[serde(default)]
    pub sli: Option<f64>,
    #[serde(rename = "slo", default)]
    pub slo_target: Option<f64>,
    #[serde(default)]
    pub total_error_budget: Option<f64>,
    #[serde(default)]
    pub error_budget_remaining: Option<f64>,
    #[serde(default, deserialize_with = "chart_entries")]
    pub error_budget_remain_chart: HashMap<String, f64>,
    #[serde(default)]
    pub from_timestamp: Option<i64>,
    #[serde(default)]
    pub to_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
}

impl SloReport {
    #[cfg(test)]
    pub fn new(sli: f64, slo_target: f64, error_budget_remaining: f64, total_error_budget: f64) -> Self {
        Self {
            sli: Some(sli),
            slo_target: Some(slo_target),
            total_error_budget: Some(total_error_budget),
            error_budget_remaining: Some(error_budget_remaining),
            ..Self::default()
        }
    }

    pub fn error_budget_remaining_percentage(&self) -> f64 {
        let total = self.total_error_budget.unwrap_or(0.0);
        if total == 0.0 {
            return 0.0;
        }
        (self.error_budget_remaining.unwrap_or(0.0) / total) * 100.0
    }

    pub fn error_budget_consumed_percentage(&self) -> f64 {
        100.0 - self.error_budget_remaining_percentage()
    }

    /// Traffic light for this report, `None` when any classification input is missing
    pub fn classify(&self, yellow_threshold: f64) -> Option<TrafficLightStatus> {
        let sli = self.sli?;
        let target = self.slo_target?;
        let remaining = self.error_budget_remaining?;
        let total = self.total_error_budget?;
        Some(traffic_light::classify(sli, target, remaining, total, yellow_threshold))
    }

    pub fn summary(&self, yellow_threshold: f64) -> String {
        traffic_light::describe(
            self.classify(yellow_threshold),
            self.sli.unwrap_or(0.0),
            self.slo_target.unwrap_or(0.0),
            self.error_budget_remaining_percentage(),
        )
    }

    pub fn chart_points(&self) -> Vec<TimeSeriesPoint> {
        time_series::reconstruct(
            &self.error_budget_remain_chart,
            self.from_timestamp,
            self.to_timestamp,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    #[serde(rename = "type", default)]
    pub window_type: Option<String>,
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub duration_unit: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
}

impl TimeWindow {
    /// e.g. "1 week", "7 days"
    pub fn formatted_size(&self) -> String {
        match &self.duration_unit {
            None => self.duration.to_string(),
            Some(unit) => {
                let plural = if self.duration > 1 { "s" } else { "" };
                format!("{} {}{}", self.duration, unit, plural)
            }
        }
    }

    pub fn formatted_type(&self) -> String {
        let mut chars = match self.window_type.as_deref() {
            Some(t) if !t.is_empty() => t.chars(),
            _ => return "Unknown".to_string(),
        };
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Unknown".to_string(),
        }
    }
}

fn chart_entries<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Option<f64>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}
