use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::RagError;

/// A slice of report text prepared for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    /// Byte offset of the chunk's first line in the source text.
    pub char_offset: usize,
}

/// A stored chunk returned by a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub report_id: Uuid,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

/// Identifies a report in the similarity comparator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub id: Uuid,
    pub source: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Text to fixed-length vector.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
    fn dimension(&self) -> usize;
}

impl EmbeddingModel for Box<dyn EmbeddingModel> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

/// Nearest-neighbour lookup over stored chunks.
pub trait VectorSearch: Send + Sync {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, RagError>;
}
