use std::sync::Mutex;

use uuid::Uuid;

use super::types::{ReportMetadata, ScoredChunk, TextChunk, VectorSearch};
use super::RagError;

/// In-memory chunk store searched by cosine similarity.
pub struct InMemoryVectorSearch {
    entries: Mutex<Vec<StoredChunk>>,
}

struct StoredChunk {
    report_id: Uuid,
    source: String,
    chunk_index: usize,
    content: String,
    embedding: Vec<f32>,
}

impl InMemoryVectorSearch {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Store one report's chunks, replacing any earlier chunks for `report_id`.
    pub fn add(
        &self,
        report_id: Uuid,
        source: &str,
        chunks: &[TextChunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RagError::VectorSearch(format!("Lock poisoned: {e}")))?;
        entries.retain(|e| e.report_id != report_id);
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            entries.push(StoredChunk {
                report_id,
                source: source.to_string(),
                chunk_index: chunk.chunk_index,
                content: chunk.content.clone(),
                embedding,
            });
        }
        Ok(chunks.len())
    }

    pub fn remove_source(&self, source: &str) -> Result<(), RagError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RagError::VectorSearch(format!("Lock poisoned: {e}")))?;
        entries.retain(|e| e.source != source);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for InMemoryVectorSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorSearch for InMemoryVectorSearch {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RagError::VectorSearch(format!("Lock poisoned: {e}")))?;

        let mut scored: Vec<(f32, &StoredChunk)> = entries
            .iter()
            .map(|entry| (cosine_similarity(query_embedding, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| ScoredChunk {
                report_id: entry.report_id,
                source: entry.source.clone(),
                chunk_index: entry.chunk_index,
                content: entry.content.clone(),
                score,
            })
            .collect())
    }
}

/// Whole-report similarity: one embedding per report.
#[derive(Debug, Clone, Default)]
pub struct ReportComparator {
    reports: Vec<(ReportMetadata, Vec<f32>)>,
}

impl ReportComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a report. A report with the same source replaces the old one.
    pub fn add_report(&mut self, metadata: ReportMetadata, embedding: Vec<f32>) {
        self.reports.retain(|(m, _)| m.source != metadata.source);
        self.reports.push((metadata, embedding));
    }

    /// Up to `k` reports by descending cosine similarity.
    pub fn find_similar(&self, embedding: &[f32], k: usize) -> Vec<(ReportMetadata, f32)> {
        let mut scored: Vec<(ReportMetadata, f32)> = self
            .reports
            .iter()
            .map(|(m, e)| (m.clone(), cosine_similarity(embedding, e)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn chunk(i: usize, content: &str) -> TextChunk {
        TextChunk {
            content: content.into(),
            chunk_index: i,
            char_offset: 0,
        }
    }

    fn meta(source: &str) -> ReportMetadata {
        ReportMetadata {
            id: Uuid::new_v4(),
            source: source.into(),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn cosine_similarity_identical_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_or_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn search_orders_by_score() {
        let store = InMemoryVectorSearch::new();
        let id = Uuid::new_v4();
        store
            .add(
                id,
                "a.pdf",
                &[chunk(0, "far"), chunk(1, "near"), chunk(2, "middle")],
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            )
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "near");
        assert_eq!(results[1].content, "middle");
        assert_eq!(results[0].source, "a.pdf");
    }

    #[test]
    fn re_adding_report_replaces_chunks() {
        let store = InMemoryVectorSearch::new();
        let id = Uuid::new_v4();
        store.add(id, "a.pdf", &[chunk(0, "x"), chunk(1, "y")], vec![vec![1.0], vec![1.0]]).unwrap();
        store.add(id, "a.pdf", &[chunk(0, "z")], vec![vec![1.0]]).unwrap();
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn mismatched_counts_rejected() {
        let store = InMemoryVectorSearch::new();
        let err = store.add(Uuid::new_v4(), "a.pdf", &[chunk(0, "x")], vec![]).unwrap_err();
        assert!(matches!(err, RagError::CountMismatch { chunks: 1, embeddings: 0 }));
    }

    #[test]
    fn remove_source_and_clear() {
        let store = InMemoryVectorSearch::new();
        store.add(Uuid::new_v4(), "a.pdf", &[chunk(0, "x")], vec![vec![1.0]]).unwrap();
        store.add(Uuid::new_v4(), "b.pdf", &[chunk(0, "y")], vec![vec![1.0]]).unwrap();
        store.remove_source("a.pdf").unwrap();
        assert_eq!(store.count(), 1);
        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.search(&[1.0], 4).unwrap().is_empty());
    }

    #[test]
    fn comparator_descending_similarity() {
        let mut cmp = ReportComparator::new();
        cmp.add_report(meta("low.pdf"), vec![0.0, 1.0]);
        cmp.add_report(meta("high.pdf"), vec![1.0, 0.0]);
        cmp.add_report(meta("mid.pdf"), vec![0.6, 0.8]);

        let similar = cmp.find_similar(&[1.0, 0.0], 3);
        let sources: Vec<&str> = similar.iter().map(|(m, _)| m.source.as_str()).collect();
        assert_eq!(sources, vec!["high.pdf", "mid.pdf", "low.pdf"]);
        assert!(similar[0].1 >= similar[1].1 && similar[1].1 >= similar[2].1);
    }

    #[test]
    fn comparator_truncates_to_k() {
        let mut cmp = ReportComparator::new();
        cmp.add_report(meta("a.pdf"), vec![1.0]);
        cmp.add_report(meta("b.pdf"), vec![1.0]);
        assert_eq!(cmp.find_similar(&[1.0], 1).len(), 1);
        assert!(cmp.find_similar(&[1.0], 0).is_empty());
    }

    #[test]
    fn comparator_replaces_same_source() {
        let mut cmp = ReportComparator::new();
        cmp.add_report(meta("a.pdf"), vec![1.0]);
        cmp.add_report(meta("a.pdf"), vec![1.0]);
        assert_eq!(cmp.len(), 1);
    }
}
