use crate::models::{BloodPressureCategory, MetricStatus, MetricValue, ReferenceRange};

/// Compare a value against its interval. Inclusive at both bounds.
///
/// Pairs, missing values and absent ranges are `Unknown`.
pub fn classify(value: &MetricValue, range: Option<&ReferenceRange>) -> MetricStatus {
    let (Some(v), Some(range)) = (value.as_scalar(), range) else {
        return MetricStatus::Unknown;
    };
    if v < range.low() {
        MetricStatus::Low
    } else if v > range.high() {
        MetricStatus::High
    } else {
        MetricStatus::Normal
    }
}

pub const HYPERTENSION_SYSTOLIC: u32 = 140;
pub const HYPERTENSION_DIASTOLIC: u32 = 90;
pub const PREHYPERTENSION_SYSTOLIC: u32 = 120;
pub const PREHYPERTENSION_DIASTOLIC: u32 = 80;

/// Blood-pressure category from a systolic/diastolic reading.
pub fn classify_blood_pressure(systolic: u32, diastolic: u32) -> BloodPressureCategory {
    if systolic >= HYPERTENSION_SYSTOLIC || diastolic >= HYPERTENSION_DIASTOLIC {
        BloodPressureCategory::Hypertension
    } else if systolic >= PREHYPERTENSION_SYSTOLIC || diastolic >= PREHYPERTENSION_DIASTOLIC {
        BloodPressureCategory::Prehypertension
    } else {
        BloodPressureCategory::Normal
    }
}

/// Category for a record value, `None` unless the value is a pair.
pub fn blood_pressure_category(value: &MetricValue) -> Option<BloodPressureCategory> {
    value
        .as_pair()
        .map(|(systolic, diastolic)| classify_blood_pressure(systolic, diastolic))
}
