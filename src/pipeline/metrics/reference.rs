use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::names::{canonical_name, surface_forms};
use super::MetricsError;
use crate::models::ReferenceRange;

/// One row of the static reference table (also the JSON override format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub metric: String,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Adult reference intervals. Percentage metrics use the 0-100 scale.
const BUILTIN_RANGES: &[(&str, f64, f64, &str)] = &[
    ("Hemoglobin", 13.0, 17.0, "g/dL"),
    ("RBC", 4.5, 5.5, "million/µL"),
    ("WBC", 4000.0, 11000.0, "cells/µL"),
    ("Platelets", 150000.0, 410000.0, "/µL"),
    ("Hematocrit", 40.0, 50.0, "%"),
    ("MCV", 83.0, 101.0, "fL"),
    ("MCH", 27.0, 32.0, "pg"),
    ("MCHC", 31.5, 34.5, "g/dL"),
    ("RDW", 11.6, 14.0, "%"),
    ("Neutrophils", 40.0, 80.0, "%"),
    ("Lymphocytes", 20.0, 40.0, "%"),
    ("Eosinophils", 1.0, 6.0, "%"),
    ("Monocytes", 2.0, 10.0, "%"),
    ("Basophils", 0.0, 2.0, "%"),
    ("ESR", 0.0, 20.0, "mm/hr"),
    ("Glucose", 70.0, 100.0, "mg/dL"),
    ("HbA1c", 4.0, 5.6, "%"),
    ("Creatinine", 0.7, 1.3, "mg/dL"),
    ("Urea", 15.0, 40.0, "mg/dL"),
    ("BUN", 7.0, 20.0, "mg/dL"),
    ("Uric Acid", 3.5, 7.2, "mg/dL"),
    ("Cholesterol", 125.0, 200.0, "mg/dL"),
    ("HDL", 40.0, 60.0, "mg/dL"),
    ("LDL", 0.0, 100.0, "mg/dL"),
    ("Triglycerides", 0.0, 150.0, "mg/dL"),
    ("Sodium", 135.0, 145.0, "mmol/L"),
    ("Potassium", 3.5, 5.1, "mmol/L"),
    ("Chloride", 98.0, 107.0, "mmol/L"),
    ("Calcium", 8.5, 10.5, "mg/dL"),
    ("Bilirubin", 0.3, 1.2, "mg/dL"),
    ("ALT", 7.0, 56.0, "U/L"),
    ("AST", 10.0, 40.0, "U/L"),
    ("ALP", 44.0, 147.0, "U/L"),
    ("Albumin", 3.5, 5.0, "g/dL"),
    ("TSH", 0.4, 4.0, "mIU/L"),
    ("Vitamin D", 30.0, 100.0, "ng/mL"),
    ("Vitamin B12", 200.0, 900.0, "pg/mL"),
    ("Ferritin", 30.0, 400.0, "ng/mL"),
    ("Iron", 60.0, 170.0, "µg/dL"),
    ("BMI", 18.5, 24.9, "kg/m²"),
];

/// Static reference intervals, one per canonical metric.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    /// The built-in adult table.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_RANGES
                .iter()
                .map(|(metric, low, high, unit)| ReferenceEntry {
                    metric: (*metric).to_string(),
                    low: *low,
                    high: *high,
                    unit: Some((*unit).to_string()),
                })
                .collect(),
        }
    }

    /// Built-in table overridden and extended by a JSON array of entries.
    pub fn load(path: &Path) -> Result<Self, MetricsError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            MetricsError::ReferenceDataLoad(path.display().to_string(), e.to_string())
        })?;
        let overrides: Vec<ReferenceEntry> = serde_json::from_str(&json).map_err(|e| {
            MetricsError::ReferenceDataParse(path.display().to_string(), e.to_string())
        })?;

        let mut table = Self::builtin();
        for entry in overrides {
            if ReferenceRange::new(entry.low, entry.high).is_none() {
                return Err(MetricsError::ReferenceDataParse(
                    path.display().to_string(),
                    format!("inverted range for {}", entry.metric),
                ));
            }
            table.upsert(entry);
        }
        tracing::info!(
            path = %path.display(),
            entries = table.entries.len(),
            "Loaded reference range overrides"
        );
        Ok(table)
    }

    fn upsert(&mut self, mut entry: ReferenceEntry) {
        entry.metric = canonical_name(&entry.metric);
        match self
            .entries
            .iter_mut()
            .find(|e| e.metric.eq_ignore_ascii_case(&entry.metric))
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    fn entry(&self, metric: &str) -> Option<&ReferenceEntry> {
        let canonical = canonical_name(metric);
        self.entries
            .iter()
            .find(|e| e.metric.eq_ignore_ascii_case(&canonical))
    }

    pub fn range(&self, metric: &str) -> Option<ReferenceRange> {
        self.entry(metric)
            .and_then(|e| ReferenceRange::new(e.low, e.high))
    }

    /// Conventional unit for a metric, if the table knows one.
    pub fn unit(&self, metric: &str) -> Option<&str> {
        self.entry(metric).and_then(|e| e.unit.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

static TEXT_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:-|–|—|\bto\b)\s*(\d[\d,]*(?:\.\d+)?)").unwrap()
});

/// Supplies the normal interval for a metric: static table first, then the
/// report text itself.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    table: ReferenceTable,
}

impl ReferenceResolver {
    pub fn new(table: ReferenceTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn resolve(&self, metric: &str, source_text: Option<&str>) -> Option<ReferenceRange> {
        if let Some(range) = self.table.range(metric) {
            return Some(range);
        }
        let found = source_text.and_then(|text| scan_text_for_range(metric, text));
        if found.is_none() {
            tracing::debug!(metric = %metric, "Reference range unresolved");
        }
        found
    }
}

/// Find the first `low-high` pair on a line that mentions the metric.
/// Later conflicting ranges in the same document are ignored.
pub fn scan_text_for_range(metric: &str, text: &str) -> Option<ReferenceRange> {
    let label = label_pattern(metric)?;

    for line in text.lines() {
        let Some(found) = label.find(line) else {
            continue;
        };
        let after_label = &line[found.end()..];
        for caps in TEXT_RANGE.captures_iter(after_label) {
            let low = caps.get(1).and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());
            let high = caps.get(2).and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());
            if let (Some(low), Some(high)) = (low, high) {
                if let Some(range) = ReferenceRange::new(low, high) {
                    return Some(range);
                }
            }
        }
    }
    None
}

/// Word-bounded alternation over every surface form of the metric.
fn label_pattern(metric: &str) -> Option<Regex> {
    let mut forms = surface_forms(metric);
    forms.sort_by_key(|f| std::cmp::Reverse(f.len()));
    let alternation = forms
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:^|[^a-z0-9])(?:{alternation})(?:[^a-z0-9]|$)")).ok()
}
