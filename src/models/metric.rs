use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::enums::MetricStatus;
use super::ModelError;
use crate::pipeline::metrics::status::classify;

/// A metric value after parsing. Composite pairs are never reduced to a scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    /// Dual reading such as systolic/diastolic blood pressure.
    Pair(u32, u32),
    Missing,
}

impl MetricValue {
    /// Numeric view of the value. `None` for pairs and missing values.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Pair(..) | Self::Missing => None,
        }
    }

    pub fn as_pair(&self) -> Option<(u32, u32)> {
        match self {
            Self::Pair(a, b) => Some((*a, *b)),
            Self::Scalar(_) | Self::Missing => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Pair(..))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => f.write_str(&format_number(*v)),
            Self::Pair(a, b) => write!(f, "{a}/{b}"),
            Self::Missing => Ok(()),
        }
    }
}

/// Scalars serialize as JSON numbers, pairs as `"150/95"`, missing as `null`.
impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(v) => serializer.serialize_f64(*v),
            Self::Pair(..) => serializer.collect_str(self),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Format a number without a trailing `.0` for whole values.
pub fn format_number(v: f64) -> String {
    format!("{v}")
}

/// Closed clinical interval `[low, high]`, same scale as the value it judges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceRange {
    low: f64,
    high: f64,
}

impl ReferenceRange {
    /// Returns `None` unless both bounds are finite and `low <= high`.
    pub fn new(low: f64, high: f64) -> Option<Self> {
        if low.is_finite() && high.is_finite() && low <= high {
            Some(Self { low, high })
        } else {
            None
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_number(self.low), format_number(self.high))
    }
}

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d[\d,]*(?:\.\d+)?)\s*(?:-|–|—|to)\s*(\d[\d,]*(?:\.\d+)?)\s*[a-zµ%/^0-9.]*\s*$")
        .unwrap()
});

impl std::str::FromStr for ReferenceRange {
    type Err = ModelError;

    /// Accepts `13-17`, `13.0 – 17.0`, `150,000 to 410,000`, optionally followed by a unit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RANGE_PATTERN
            .captures(s)
            .ok_or_else(|| ModelError::InvalidRange(s.into()))?;
        let bound = |i: usize| -> Option<f64> { caps.get(i)?.as_str().replace(',', "").parse().ok() };
        match (bound(1), bound(2)) {
            (Some(low), Some(high)) => {
                Self::new(low, high).ok_or_else(|| ModelError::InvalidRange(s.into()))
            }
            _ => Err(ModelError::InvalidRange(s.into())),
        }
    }
}

/// One observation for one report.
///
/// Fields are read-only: `status` is always recomputed from `value` and
/// `reference_range` at construction, so a record can never carry a stale flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    metric: String,
    value: MetricValue,
    unit: Option<String>,
    reference_range: Option<ReferenceRange>,
    status: MetricStatus,
}

impl MetricRecord {
    pub fn new(
        metric: impl Into<String>,
        value: MetricValue,
        unit: Option<String>,
        reference_range: Option<ReferenceRange>,
    ) -> Self {
        let status = classify(&value, reference_range.as_ref());
        Self {
            metric: metric.into(),
            value,
            unit: unit.filter(|u| !u.trim().is_empty()),
            reference_range,
            status,
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Unit for display, `Unknown` when it could not be determined.
    pub fn unit_or_unknown(&self) -> &str {
        self.unit.as_deref().unwrap_or("Unknown")
    }

    pub fn reference_range(&self) -> Option<&ReferenceRange> {
        self.reference_range.as_ref()
    }

    pub fn status(&self) -> MetricStatus {
        self.status
    }

    /// Rebuild with a different value; status is recomputed.
    pub fn with_value(&self, value: MetricValue) -> Self {
        Self::new(self.metric.clone(), value, self.unit.clone(), self.reference_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_computed_at_construction() {
        let range = ReferenceRange::new(13.0, 17.0);
        let record = MetricRecord::new("Hemoglobin", MetricValue::Scalar(10.5), Some("g/dL".into()), range);
        assert_eq!(record.status(), MetricStatus::Low);

        let rebuilt = record.with_value(MetricValue::Scalar(14.0));
        assert_eq!(rebuilt.status(), MetricStatus::Normal);
    }

    #[test]
    fn pair_record_is_unknown() {
        let record = MetricRecord::new("Blood Pressure", MetricValue::Pair(150, 95), None, None);
        assert_eq!(record.status(), MetricStatus::Unknown);
        assert_eq!(record.unit_or_unknown(), "Unknown");
        assert_eq!(record.value().to_string(), "150/95");
    }

    #[test]
    fn empty_unit_treated_as_absent() {
        let record = MetricRecord::new("Urea", MetricValue::Scalar(30.0), Some("  ".into()), None);
        assert!(record.unit().is_none());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(ReferenceRange::new(17.0, 13.0).is_none());
        assert!(ReferenceRange::new(f64::NAN, 13.0).is_none());
        assert!(ReferenceRange::new(5.0, 5.0).is_some());
    }

    #[test]
    fn range_parses_common_forms() {
        let r: ReferenceRange = "13.0-17.0".parse().unwrap();
        assert_eq!((r.low(), r.high()), (13.0, 17.0));

        let r: ReferenceRange = "150,000 to 410,000".parse().unwrap();
        assert_eq!((r.low(), r.high()), (150_000.0, 410_000.0));

        let r: ReferenceRange = "4.5 – 5.5 mill/cumm".parse().unwrap();
        assert_eq!((r.low(), r.high()), (4.5, 5.5));

        assert!("N/A".parse::<ReferenceRange>().is_err());
        assert!("17-13".parse::<ReferenceRange>().is_err());
    }

    #[test]
    fn range_display_drops_trailing_zero() {
        let r = ReferenceRange::new(13.0, 17.5).unwrap();
        assert_eq!(r.to_string(), "13-17.5");
    }

    #[test]
    fn value_serializes_by_variant() {
        assert_eq!(serde_json::to_string(&MetricValue::Scalar(10.5)).unwrap(), "10.5");
        assert_eq!(serde_json::to_string(&MetricValue::Pair(120, 80)).unwrap(), "\"120/80\"");
        assert_eq!(serde_json::to_string(&MetricValue::Missing).unwrap(), "null");
    }
}
