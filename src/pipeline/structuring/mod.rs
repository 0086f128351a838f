pub mod types;
pub mod prompt;
pub mod parser;
pub mod sanitize;
pub mod client;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use sanitize::*;
pub use client::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Completion service unreachable at {0}")]
    Connection(String),

    #[error("Completion service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Completion service returned no content")]
    EmptyResponse,

    #[error("Structured summary parse failed: {0}")]
    StructuredParse(String),

    #[error("Input text too short to summarize")]
    InputTooShort,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
