use std::fmt;

use serde::Serialize;

/// A non-fatal problem reported alongside analysis results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// No page of the document yielded text; it was excluded.
    UnreadableDocument { source: String },
    /// The summary's metric array could not be parsed; pattern extraction was used.
    StructuredParseFailure { source: String, message: String },
    /// An external collaborator failed; the pipeline continued without it.
    CollaboratorFailure { collaborator: String, message: String },
}

impl AnalysisWarning {
    pub fn collaborator(collaborator: &str, message: impl fmt::Display) -> Self {
        Self::CollaboratorFailure {
            collaborator: collaborator.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableDocument { source } => {
                write!(f, "{source}: no readable text, document skipped")
            }
            Self::StructuredParseFailure { source, message } => {
                write!(f, "{source}: summary metrics unparseable ({message}), used pattern extraction")
            }
            Self::CollaboratorFailure { collaborator, message } => {
                write!(f, "{collaborator} unavailable: {message}")
            }
        }
    }
}
