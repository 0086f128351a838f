//! Lab-metric extraction and normalization.
//!
//! Raw report text in, ordered `MetricRecord`s out. Pure and synchronous: no
//! I/O except `ReferenceTable::load`.

pub mod value;
pub mod names;
pub mod registry;
pub mod table;
pub mod free_text;
pub mod extractor;
pub mod percentage;
pub mod reference;
pub mod status;
pub mod builder;

pub use builder::*;
pub use extractor::*;
pub use names::{canonical_name, surface_forms};
pub use percentage::*;
pub use reference::*;
pub use registry::{MetricRule, RuleRegistry, ValueKind};
pub use status::*;
pub use value::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to read reference ranges from {0}: {1}")]
    ReferenceDataLoad(String, String),

    #[error("Invalid reference ranges in {0}: {1}")]
    ReferenceDataParse(String, String),
}
