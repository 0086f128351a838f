pub mod extraction;
pub mod metrics; // Pattern extraction, normalization, classification
pub mod structuring;
pub mod rag;
