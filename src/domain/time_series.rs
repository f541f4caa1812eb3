// Error budget time series reconstruction
use crate::error::SloError;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Epoch millis when the report carried a time range, otherwise the raw index
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

fn parse_index(key: &str) -> Result<u32, SloError> {
    key.parse::<u32>()
        .map_err(|e| SloError::Parse(format!("chart key {:?}: {}", key, e)))
}

/// Rebuild the sparse `index -> value` chart map into an ordered series.
///
/// Keys that are not non-negative integers are skipped. When both bounds are
/// known, the i-th valid point lands at `from + i * (to - from) / (n - 1)`;
/// the interval is computed over the count of valid points, not the largest
/// index, and collapses to zero for a single point or an empty range.
pub fn reconstruct(
    chart: &HashMap<String, f64>,
    from_timestamp: Option<i64>,
    to_timestamp: Option<i64>,
) -> Vec<TimeSeriesPoint> {
    let mut indexed: Vec<(u32, f64)> = chart
        .iter()
        .filter_map(|(key, value)| match parse_index(key) {
            Ok(idx) => Some((idx, *value)),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping chart entry");
                None
            }
        })
        .collect();
    indexed.sort_by_key(|(idx, _)| *idx);

    let Some((from, to)) = from_timestamp.zip(to_timestamp) else {
        return indexed
            .into_iter()
            .map(|(idx, value)| TimeSeriesPoint::new(i64::from(idx), value))
            .collect();
    };

    let num_points = indexed.len() as i64;
    let interval = if num_points > 1 && to > from {
        (to - from) / (num_points - 1)
    } else {
        0
    };

    indexed
        .into_iter()
        .enumerate()
        .map(|(position, (_, value))| TimeSeriesPoint::new(from + position as i64 * interval, value))
        .collect()
}

/// Downsample a series using bucket averaging
pub fn downsample(points: Vec<TimeSeriesPoint>, max_points: usize) -> Vec<TimeSeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = (points.len() as f64 / max_points as f64).ceil() as usize;

    points
        .chunks(bucket_size)
        .map(|chunk| {
            // middle point's timestamp, average value
            let mid_idx = chunk.len() / 2;
            let avg_value = chunk.iter().map(|p| p.value).sum::<f64>() / chunk.len() as f64;
            TimeSeriesPoint::new(chunk[mid_idx].time_ms, avg_value)
        })
        .collect()
}
