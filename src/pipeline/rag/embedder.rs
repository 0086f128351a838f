use sha2::{Digest, Sha256};

use super::types::EmbeddingModel;
use super::RagError;

pub const DEFAULT_EMBEDDING_DIM: usize = 256;

/// Deterministic bag-of-words embedder.
///
/// Each lowercased alphanumeric token is hashed into one signed bucket; the
/// result is L2-normalized. Texts sharing vocabulary score high under cosine
/// similarity. No model files, no network.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rag::retrieval::cosine_similarity;

    #[test]
    fn embedding_has_correct_dimension() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed("Hemoglobin 10.5").unwrap().len(), DEFAULT_EMBEDDING_DIM);
        assert_eq!(e.dimension(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn embedding_is_deterministic() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed("Glucose 95 mg/dL").unwrap(), e.embed("Glucose 95 mg/dL").unwrap());
    }

    #[test]
    fn embedding_is_normalized() {
        let v = HashingEmbedder::default().embed("complete blood count report").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_zero_vector() {
        let v = HashingEmbedder::default().embed("  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn case_insensitive_tokens() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed("HEMOGLOBIN low").unwrap(), e.embed("hemoglobin LOW").unwrap());
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::default();
        let a = e.embed("hemoglobin low anemia iron").unwrap();
        let b = e.embed("hemoglobin low iron deficiency").unwrap();
        let c = e.embed("thyroid stimulating hormone normal").unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn batch_matches_single() {
        let e = HashingEmbedder::default();
        let batch = e.embed_batch(&["one", "two"]).unwrap();
        assert_eq!(batch[0], e.embed("one").unwrap());
        assert_eq!(batch[1], e.embed("two").unwrap());
    }
}
