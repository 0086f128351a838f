//! Document bytes to report text.

pub mod reader;

pub use reader::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("No readable text in {0}")]
    Unreadable(String),
}
