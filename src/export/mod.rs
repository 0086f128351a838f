pub mod csv;
pub mod pdf;

pub use self::csv::*;
pub use self::pdf::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Invalid CSV row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}
