use crate::models::MatchSource;

use super::registry::RuleRegistry;
use super::{free_text, table};

/// One captured occurrence, before value parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    /// Label as it appeared in the text.
    pub label: String,
    /// Raw value substring.
    pub raw: String,
    pub unit: Option<String>,
    pub source: MatchSource,
}

/// Canonical metric name to raw match, in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMatches {
    entries: Vec<(String, RawMatch)>,
}

impl ExtractedMatches {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, metric: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(metric))
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, metric: String, found: RawMatch) {
        match self.position(&metric) {
            Some(i) => self.entries[i].1 = found,
            None => self.entries.push((metric, found)),
        }
    }

    /// Insert only when the metric is not already present. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, metric: String, found: RawMatch) -> bool {
        if self.contains(&metric) {
            return false;
        }
        self.entries.push((metric, found));
        true
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.position(metric).is_some()
    }

    pub fn get(&self, metric: &str) -> Option<&RawMatch> {
        self.position(metric).map(|i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawMatch)> {
        self.entries.iter().map(|(name, m)| (name.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ExtractedMatches {
    type Item = (String, RawMatch);
    type IntoIter = std::vec::IntoIter<(String, RawMatch)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Tabular pass, then free-text pass. Free text never overwrites a table hit.
pub fn extract_matches(text: &str, registry: &RuleRegistry) -> ExtractedMatches {
    let mut matches = table::extract_table_rows(text);
    let from_tables = matches.len();
    free_text::extract_free_text(text, registry, &mut matches);

    tracing::debug!(
        table = from_tables,
        free_text = matches.len() - from_tables,
        "Metric extraction passes complete"
    );
    matches
}
