use crate::models::{MetricRecord, MetricValue, ReferenceRange};
use crate::pipeline::structuring::SummaryMetric;

use super::extractor::{extract_matches, RawMatch};
use super::names::canonical_name;
use super::percentage::normalize_percentage;
use super::reference::{scan_text_for_range, ReferenceResolver};
use super::registry::{is_percentage_metric, RuleRegistry};
use super::value::split_value_and_unit;

/// Placeholder the summarizer uses for fields it could not fill.
const NOT_AVAILABLE: &str = "N/A";

/// Turns report text (or a parsed structured summary) into an ordered record set.
///
/// Never fails: an empty vector means no usable metrics were found.
#[derive(Debug, Clone, Default)]
pub struct MetricRecordBuilder {
    registry: RuleRegistry,
    resolver: ReferenceResolver,
}

impl MetricRecordBuilder {
    pub fn new(registry: RuleRegistry, resolver: ReferenceResolver) -> Self {
        Self { registry, resolver }
    }

    pub fn with_resolver(resolver: ReferenceResolver) -> Self {
        Self {
            registry: RuleRegistry::default(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Extract, parse, normalize, resolve ranges, classify. Ordered by first extraction.
    pub fn build(&self, text: &str) -> Vec<MetricRecord> {
        let records: Vec<MetricRecord> = extract_matches(text, &self.registry)
            .into_iter()
            .filter_map(|(metric, found)| self.record_from_match(&metric, &found, text))
            .collect();

        tracing::info!(metrics = records.len(), "Built metric records from text");
        records
    }

    fn record_from_match(&self, metric: &str, found: &RawMatch, text: &str) -> Option<MetricRecord> {
        let Some((parsed, _)) = split_value_and_unit(&found.raw) else {
            tracing::debug!(metric = %metric, source = %found.source, "Extraction miss: value did not parse");
            return None;
        };
        let value = normalize_percentage(metric, parsed.to_metric_value());
        let unit = found.unit.clone().or_else(|| default_unit(metric));
        let range = self.resolver.resolve(metric, Some(text));
        Some(MetricRecord::new(metric, value, unit, range))
    }

    /// Records from structured-summary metrics.
    ///
    /// The summary's status is ignored and recomputed. Its stated range is
    /// used only when the static table has none; the report text is the last
    /// resort. Later duplicates of a metric are dropped.
    pub fn build_from_summary(&self, metrics: &[SummaryMetric], text: &str) -> Vec<MetricRecord> {
        let mut records: Vec<MetricRecord> = Vec::with_capacity(metrics.len());

        for item in metrics {
            let label = item.metric.trim();
            if is_placeholder(label) {
                continue;
            }
            let metric = canonical_name(label);
            if records.iter().any(|r| r.metric().eq_ignore_ascii_case(&metric)) {
                continue;
            }

            let (value, inline_unit) = match split_value_and_unit(&item.value) {
                Some((parsed, unit)) => (normalize_percentage(&metric, parsed.to_metric_value()), unit),
                None => (MetricValue::Missing, None),
            };

            let unit = non_placeholder(&item.unit)
                .or(inline_unit)
                .or_else(|| default_unit(&metric));

            let range = self
                .resolver
                .table()
                .range(&metric)
                .or_else(|| non_placeholder(&item.reference_range).and_then(|r| r.parse::<ReferenceRange>().ok()))
                .or_else(|| scan_text_for_range(&metric, text));

            records.push(MetricRecord::new(metric, value, unit, range));
        }

        tracing::info!(metrics = records.len(), "Built metric records from summary");
        records
    }
}

/// Percentage-native metrics default to `%` when no unit was captured.
fn default_unit(metric: &str) -> Option<String> {
    is_percentage_metric(metric).then(|| "%".to_string())
}

fn is_placeholder(field: &str) -> bool {
    let trimmed = field.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_AVAILABLE)
}

fn non_placeholder(field: &str) -> Option<String> {
    (!is_placeholder(field)).then(|| field.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricStatus;

    fn summary_metric(metric: &str, value: &str, range: &str, unit: &str, status: &str) -> SummaryMetric {
        SummaryMetric {
            metric: metric.into(),
            value: value.into(),
            reference_range: range.into(),
            unit: unit.into(),
            status: status.into(),
        }
    }

    #[test]
    fn low_hemoglobin_from_prose() {
        let records = MetricRecordBuilder::default().build("Hemoglobin: 10.5 g/dL");
        assert_eq!(records.len(), 1);
        let hb = &records[0];
        assert_eq!(hb.metric(), "Hemoglobin");
        assert_eq!(hb.value(), &MetricValue::Scalar(10.5));
        assert_eq!(hb.unit(), Some("g/dL"));
        assert_eq!(hb.reference_range().unwrap().to_string(), "13-17");
        assert_eq!(hb.status(), MetricStatus::Low);
    }

    #[test]
    fn blood_pressure_stays_a_pair() {
        let records = MetricRecordBuilder::default().build("BP: 150/95 mmHg");
        let bp = records.iter().find(|r| r.metric() == "Blood Pressure").unwrap();
        assert_eq!(bp.value(), &MetricValue::Pair(150, 95));
        assert_eq!(bp.status(), MetricStatus::Unknown);
    }

    #[test]
    fn wbc_thousands_separator() {
        let records = MetricRecordBuilder::default().build("WBC 10,570 /cumm");
        assert_eq!(records[0].value(), &MetricValue::Scalar(10570.0));
        assert_eq!(records[0].status(), MetricStatus::Normal);
    }

    #[test]
    fn hematocrit_fraction_normalized() {
        let records = MetricRecordBuilder::default().build("Hematocrit: 0.45");
        assert_eq!(records[0].value(), &MetricValue::Scalar(45.0));
        assert_eq!(records[0].unit(), Some("%"));
        assert_eq!(records[0].status(), MetricStatus::Normal);
    }

    #[test]
    fn empty_text_builds_nothing() {
        assert!(MetricRecordBuilder::default().build("").is_empty());
        assert!(MetricRecordBuilder::default()
            .build("Patient seen for routine follow-up.")
            .is_empty());
    }

    #[test]
    fn table_rows_precede_free_text_in_order() {
        let text = "Glucose 95 mg/dL\n| Hb | 10.5 | g/dL | 13-17 |";
        let records = MetricRecordBuilder::default().build(text);
        let names: Vec<&str> = records.iter().map(|r| r.metric()).collect();
        assert_eq!(names, vec!["Hemoglobin", "Glucose"]);
    }

    #[test]
    fn qualified_table_labels_yield_one_record_per_analyte() {
        let text = "| Serum Sodium | 140 | mmol/L | 135-145 |\n| Hemoglobin A1c | 6.1 | % | 4-5.6 |";
        let records = MetricRecordBuilder::default().build(text);
        let names: Vec<&str> = records.iter().map(|r| r.metric()).collect();
        assert_eq!(names, vec!["Sodium", "HbA1c"]);
        assert_eq!(records[0].status(), MetricStatus::Normal);
    }

    #[test]
    fn report_header_lines_are_not_metrics() {
        let text = "Patient Name    John Doe    Age    45\n\
                    Sample No    12345    Lab   Central\n\
                    Hemoglobin    10.5    g/dL    13-17";
        let records = MetricRecordBuilder::default().build(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric(), "Hemoglobin");
        assert_eq!(records[0].status(), MetricStatus::Low);
    }

    #[test]
    fn unmapped_table_metric_uses_text_range() {
        let text = "| Procalcitonin | 0.3 | ng/mL | 0.0-0.5 |";
        let records = MetricRecordBuilder::default().build(text);
        assert_eq!(records[0].metric(), "Procalcitonin");
        assert_eq!(records[0].status(), MetricStatus::Normal);
    }

    #[test]
    fn summary_status_recomputed() {
        let metrics = vec![summary_metric("hemoglobin", "10.5", "13-17", "g/dL", "Normal")];
        let records = MetricRecordBuilder::default().build_from_summary(&metrics, "");
        assert_eq!(records[0].metric(), "Hemoglobin");
        assert_eq!(records[0].status(), MetricStatus::Low);
    }

    #[test]
    fn summary_placeholders_handled() {
        let metrics = vec![
            summary_metric("Lipase", "N/A", "13-60", "N/A", "N/A"),
            summary_metric("N/A", "12", "N/A", "N/A", "N/A"),
        ];
        let records = MetricRecordBuilder::default().build_from_summary(&metrics, "");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value(), &MetricValue::Missing);
        assert_eq!(records[0].unit(), None);
        assert_eq!(records[0].status(), MetricStatus::Unknown);
    }

    #[test]
    fn summary_range_used_when_table_has_none() {
        let metrics = vec![summary_metric("Lipase", "75 U/L", "13-60", "N/A", "High")];
        let records = MetricRecordBuilder::default().build_from_summary(&metrics, "");
        assert_eq!(records[0].unit(), Some("U/L"));
        assert_eq!(records[0].status(), MetricStatus::High);
    }

    #[test]
    fn summary_duplicates_dropped() {
        let metrics = vec![
            summary_metric("Hb", "10.5", "N/A", "g/dL", "Low"),
            summary_metric("Hemoglobin", "14.0", "N/A", "g/dL", "Normal"),
        ];
        let records = MetricRecordBuilder::default().build_from_summary(&metrics, "");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value(), &MetricValue::Scalar(10.5));
    }
}
