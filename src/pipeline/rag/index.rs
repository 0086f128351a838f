use crate::config::AppConfig;
use crate::models::ReportEntry;

use super::chunker::ReportChunker;
use super::embedder::HashingEmbedder;
use super::retrieval::{InMemoryVectorSearch, ReportComparator};
use super::types::{Chunker, EmbeddingModel, ReportMetadata, ScoredChunk, VectorSearch};
use super::RagError;

/// Retrieval state for the analyzed reports: chunk index plus whole-report
/// comparator, sharing one embedder.
pub struct ReportIndex {
    chunker: ReportChunker,
    embedder: Box<dyn EmbeddingModel>,
    search: InMemoryVectorSearch,
    comparator: ReportComparator,
}

impl ReportIndex {
    pub fn new(chunker: ReportChunker, embedder: Box<dyn EmbeddingModel>) -> Self {
        Self {
            chunker,
            embedder,
            search: InMemoryVectorSearch::new(),
            comparator: ReportComparator::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ReportChunker::new(config.chunk_size, config.chunk_overlap),
            Box::new(HashingEmbedder::default()),
        )
    }

    /// Chunk, embed and store one report's text. Returns the chunk count.
    pub fn index_report(&mut self, entry: &ReportEntry, text: &str) -> Result<usize, RagError> {
        let chunks = self.chunker.chunk(text);
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&contents)?;
        for e in &embeddings {
            self.check_dimension(e)?;
        }

        self.search.remove_source(&entry.source)?;
        let stored = self.search.add(entry.id, &entry.source, &chunks, embeddings)?;

        let report_embedding = self.embedder.embed(text)?;
        self.comparator.add_report(metadata(entry), report_embedding);

        tracing::info!(source = %entry.source, chunks = stored, "Indexed report");
        Ok(stored)
    }

    /// Top-`k` chunks most similar to the question.
    pub fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let query = self.embedder.embed(question)?;
        self.check_dimension(&query)?;
        self.search.search(&query, k)
    }

    /// Previously indexed reports most similar to `text`.
    pub fn similar_reports(&self, text: &str, k: usize) -> Result<Vec<(ReportMetadata, f32)>, RagError> {
        let query = self.embedder.embed(text)?;
        Ok(self.comparator.find_similar(&query, k))
    }

    pub fn comparator(&self) -> &ReportComparator {
        &self.comparator
    }

    pub fn chunk_count(&self) -> usize {
        self.search.count()
    }

    pub fn is_empty(&self) -> bool {
        self.search.count() == 0
    }

    pub fn clear(&mut self) {
        self.search.clear();
        self.comparator.clear();
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), RagError> {
        let expected = self.embedder.dimension();
        if embedding.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

impl Default for ReportIndex {
    fn default() -> Self {
        Self::new(ReportChunker::default(), Box::new(HashingEmbedder::default()))
    }
}

fn metadata(entry: &ReportEntry) -> ReportMetadata {
    ReportMetadata {
        id: entry.id,
        source: entry.source.clone(),
        analyzed_at: entry.analyzed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WrongDimension;

    impl EmbeddingModel for WrongDimension {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Ok(vec![1.0; 3])
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn entry(source: &str, text: &str) -> ReportEntry {
        ReportEntry::new(source, text, Vec::new(), None)
    }

    #[test]
    fn index_and_retrieve() {
        let mut index = ReportIndex::default();
        let cbc = "Hemoglobin 10.5 g/dL low\nRBC 3.9 million";
        let thyroid = "TSH 2.1 mIU/L\nFree T4 normal";
        index.index_report(&entry("cbc.txt", cbc), cbc).unwrap();
        index.index_report(&entry("thyroid.txt", thyroid), thyroid).unwrap();

        let hits = index.retrieve("why is my hemoglobin low", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "cbc.txt");
    }

    #[test]
    fn reindexing_source_replaces_chunks() {
        let mut index = ReportIndex::default();
        index.index_report(&entry("a.txt", "one\ntwo"), "one\ntwo").unwrap();
        let before = index.chunk_count();
        index.index_report(&entry("a.txt", "one\ntwo"), "one\ntwo").unwrap();
        assert_eq!(index.chunk_count(), before);
        assert_eq!(index.comparator().len(), 1);
    }

    #[test]
    fn similar_reports_ranked() {
        let mut index = ReportIndex::default();
        let a = "glucose hba1c diabetes screening";
        let b = "lipid panel cholesterol triglycerides";
        index.index_report(&entry("a.txt", a), a).unwrap();
        index.index_report(&entry("b.txt", b), b).unwrap();

        let similar = index.similar_reports("fasting glucose and hba1c", 2).unwrap();
        assert_eq!(similar[0].0.source, "a.txt");
    }

    #[test]
    fn wrong_dimension_rejected() {
        let mut index = ReportIndex::new(ReportChunker::default(), Box::new(WrongDimension));
        let err = index.index_report(&entry("a.txt", "x"), "x").unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 8, actual: 3 }));
    }

    #[test]
    fn clear_empties_everything() {
        let mut index = ReportIndex::default();
        index.index_report(&entry("a.txt", "text"), "text").unwrap();
        assert!(!index.is_empty());
        index.clear();
        assert!(index.is_empty());
        assert!(index.comparator().is_empty());
    }
}
