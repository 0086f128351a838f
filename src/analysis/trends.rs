//! Per-metric series across analyzed reports, with z-score anomaly flags.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ReferenceRange, ReportHistory};

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub source: String,
    pub analyzed_at: DateTime<Utc>,
    pub value: f64,
}

/// One metric's scalar observations in history order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: String,
    pub unit: Option<String>,
    /// Range of the most recent observation, for limit lines.
    pub reference_range: Option<ReferenceRange>,
    pub points: Vec<TrendPoint>,
}

impl MetricSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Series for one metric. Reports without a scalar value for it are skipped;
/// `None` when no report has one.
pub fn metric_series(history: &ReportHistory, metric: &str) -> Option<MetricSeries> {
    let mut series: Option<MetricSeries> = None;

    for entry in history.entries() {
        let Some(record) = entry.record(metric) else {
            continue;
        };
        let Some(value) = record.value().as_scalar() else {
            continue;
        };

        let s = series.get_or_insert_with(|| MetricSeries {
            metric: record.metric().to_string(),
            unit: None,
            reference_range: None,
            points: Vec::new(),
        });
        if let Some(unit) = record.unit() {
            s.unit = Some(unit.to_string());
        }
        if let Some(range) = record.reference_range() {
            s.reference_range = Some(*range);
        }
        s.points.push(TrendPoint {
            source: entry.source.clone(),
            analyzed_at: entry.analyzed_at,
            value,
        });
    }

    series
}

/// Series for every metric with at least one scalar value, in first-seen order.
pub fn all_series(history: &ReportHistory) -> Vec<MetricSeries> {
    let mut names: Vec<&str> = Vec::new();
    for entry in history.entries() {
        for record in &entry.records {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(record.metric())) {
                names.push(record.metric());
            }
        }
    }

    names
        .into_iter()
        .filter_map(|name| metric_series(history, name))
        .collect()
}

/// Points whose distance from the series mean exceeds `threshold` sample
/// standard deviations. Fewer than two points, or zero spread, yields none.
pub fn detect_anomalies(series: &MetricSeries, threshold: f64) -> Vec<TrendPoint> {
    let values = series.values();
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();

    series
        .points
        .iter()
        .filter(|p| (p.value - mean).abs() > threshold * std)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub series: MetricSeries,
    pub anomalies: Vec<TrendPoint>,
}

/// All series with their anomalies at the default threshold.
pub fn analyze_trends(history: &ReportHistory) -> Vec<TrendSummary> {
    let summaries: Vec<TrendSummary> = all_series(history)
        .into_iter()
        .map(|series| {
            let anomalies = detect_anomalies(&series, DEFAULT_ANOMALY_THRESHOLD);
            if !anomalies.is_empty() {
                tracing::info!(metric = %series.metric, count = anomalies.len(), "Trend anomalies detected");
            }
            TrendSummary { series, anomalies }
        })
        .collect();
    summaries
}
