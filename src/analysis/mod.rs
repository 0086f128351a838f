pub mod risk;
pub mod trends;
pub mod chart;

pub use risk::*;
pub use trends::*;
pub use chart::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Risk model for {disease} failed: {message}")]
    Model { disease: String, message: String },

    #[error("Risk model for {disease} returned probability {value} outside [0, 1]")]
    InvalidProbability { disease: String, value: f64 },

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}
