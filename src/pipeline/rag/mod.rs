pub mod types;
pub mod chunker;
pub mod embedder;
pub mod retrieval;
pub mod index;
pub mod prompt;
pub mod conversation;

pub use types::*;
pub use chunker::*;
pub use embedder::*;
pub use retrieval::*;
pub use index::*;
pub use prompt::*;
pub use conversation::*;

use thiserror::Error;

use crate::pipeline::structuring::StructuringError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk/embedding count mismatch: {chunks} chunks, {embeddings} embeddings")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Completion failed: {0}")]
    Completion(#[from] StructuringError),

    #[error("Question is empty")]
    EmptyQuestion,
}
