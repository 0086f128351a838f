use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::metric::MetricRecord;

/// The record set built from one analyzed report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub id: Uuid,
    /// Source filename; the key used for trend ordering and replacement.
    pub source: String,
    /// SHA-256 of the extracted text, hex encoded.
    pub content_hash: String,
    pub analyzed_at: DateTime<Utc>,
    pub records: Vec<MetricRecord>,
    pub summary: Option<String>,
}

impl ReportEntry {
    pub fn new(source: &str, text: &str, records: Vec<MetricRecord>, summary: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            content_hash: content_hash(text),
            analyzed_at: Utc::now(),
            records,
            summary,
        }
    }

    /// Case-insensitive lookup of a metric by canonical name.
    pub fn record(&self, metric: &str) -> Option<&MetricRecord> {
        self.records
            .iter()
            .find(|r| r.metric().eq_ignore_ascii_case(metric))
    }

    pub fn has_metrics(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Analyzed reports in upload order, keyed by source filename.
///
/// Re-adding a filename replaces that entry in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportHistory {
    entries: Vec<ReportEntry>,
}

impl ReportHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace by source. Returns `true` when an entry was replaced.
    pub fn add(&mut self, entry: ReportEntry) -> bool {
        match self.entries.iter_mut().find(|e| e.source == entry.source) {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, source: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.source == source)
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entry with the given content hash, if the same text was already analyzed.
    pub fn find_by_hash(&self, hash: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.content_hash == hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// SHA-256 hex digest of report text.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
