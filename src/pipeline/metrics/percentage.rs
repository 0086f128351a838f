use crate::models::{MetricRecord, MetricValue};

use super::registry::is_percentage_metric;

/// Rescale fractional readings of percentage-native metrics to 0-100.
///
/// Only scalars strictly between 0 and 1 are touched, so already-normalized
/// values pass through unchanged. A genuine sub-1% reading (Basophils 0.5%)
/// is inflated as well; reports rarely print percentages that way.
pub fn normalize_percentage(metric: &str, value: MetricValue) -> MetricValue {
    match value {
        MetricValue::Scalar(v) if is_percentage_metric(metric) && v > 0.0 && v < 1.0 => {
            MetricValue::Scalar(round_micro(v * 100.0))
        }
        other => other,
    }
}

/// Apply `normalize_percentage` to every record, recomputing status.
pub fn normalize_record_set(records: Vec<MetricRecord>) -> Vec<MetricRecord> {
    records
        .into_iter()
        .map(|record| {
            let normalized = normalize_percentage(record.metric(), *record.value());
            if normalized == *record.value() {
                record
            } else {
                record.with_value(normalized)
            }
        })
        .collect()
}

/// Drop float noise from the x100 (0.45 * 100 = 45.00000000000001).
fn round_micro(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}
