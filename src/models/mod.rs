pub mod enums;
pub mod metric;
pub mod report;
pub mod warning;

pub use enums::*;
pub use metric::*;
pub use report::*;
pub use warning::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid reference range: {0}")]
    InvalidRange(String),
}
