use serde::{Deserialize, Serialize};

use super::StructuringError;

/// Speaker of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Text-completion collaborator.
pub trait LlmClient: Send + Sync {
    /// Complete a conversation, returning the assistant's reply.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, StructuringError>;
}

/// One metric object from the summary's machine-readable array.
///
/// Every field is text; absent fields hold `"N/A"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetric {
    pub metric: String,
    pub value: String,
    pub reference_range: String,
    pub unit: String,
    pub status: String,
}

/// A summary split into its prose and its metric array.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuredSummary {
    pub prose: String,
    pub metrics: Vec<SummaryMetric>,
}
