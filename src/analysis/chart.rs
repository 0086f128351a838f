//! Chart-ready projections of a record set. Pure data; rendering lives elsewhere.

use serde::Serialize;

use crate::models::{MetricRecord, MetricStatus};

/// RGB triple in 0-255.
pub type Rgb = (u8, u8, u8);

pub const LOW_COLOR: Rgb = (0xFF, 0x6B, 0x6B);
pub const NORMAL_COLOR: Rgb = (0x51, 0xCF, 0x66);
pub const HIGH_COLOR: Rgb = (0xFF, 0x92, 0x2B);
pub const UNKNOWN_COLOR: Rgb = (0xAD, 0xB5, 0xBD);
/// Fill of the reference band drawn behind each bar.
pub const BAND_COLOR: Rgb = (0x87, 0xCE, 0xFA);

pub fn status_color(status: MetricStatus) -> Rgb {
    match status {
        MetricStatus::Low => LOW_COLOR,
        MetricStatus::Normal => NORMAL_COLOR,
        MetricStatus::High => HIGH_COLOR,
        MetricStatus::Unknown => UNKNOWN_COLOR,
    }
}

/// One bar: the value plus its reference band, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarDatum {
    pub metric: String,
    pub value: f64,
    pub status: MetricStatus,
    pub band: Option<(f64, f64)>,
}

/// Bars for scalar records in record order. Pairs and missing values are left out.
pub fn bar_chart_data(records: &[MetricRecord]) -> Vec<BarDatum> {
    records
        .iter()
        .filter_map(|r| {
            let value = r.value().as_scalar()?;
            Some(BarDatum {
                metric: r.metric().to_string(),
                value,
                status: r.status(),
                band: r.reference_range().map(|range| (range.low(), range.high())),
            })
        })
        .collect()
}

pub const RADIAL_LOW: f64 = 0.2;
pub const RADIAL_NORMAL: f64 = 0.5;
pub const RADIAL_HIGH: f64 = 0.8;
pub const RADIAL_NO_RANGE: f64 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialScore {
    pub metric: String,
    pub score: f64,
}

/// Balance score per scalar metric: below range, within, above, or no range.
pub fn radial_scores(records: &[MetricRecord]) -> Vec<RadialScore> {
    records
        .iter()
        .filter(|r| r.value().as_scalar().is_some())
        .map(|r| RadialScore {
            metric: r.metric().to_string(),
            score: match r.status() {
                MetricStatus::Low => RADIAL_LOW,
                MetricStatus::Normal => RADIAL_NORMAL,
                MetricStatus::High => RADIAL_HIGH,
                MetricStatus::Unknown => RADIAL_NO_RANGE,
            },
        })
        .collect()
}
