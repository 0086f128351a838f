use crate::pipeline::structuring::{ChatMessage, LlmClient};

use super::index::ReportIndex;
use super::prompt::{build_question_prompt, no_context_response, CONVERSATION_SYSTEM_PROMPT};
use super::RagError;

/// Prior turns replayed to the completion service.
const HISTORY_TURNS: usize = 6;

/// Conversational question answering over indexed reports.
///
/// History holds the user's questions as asked, not the context-stuffed
/// prompts, so earlier retrievals do not accumulate.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    history: Vec<ChatMessage>,
    top_k: usize,
}

impl ConversationSession {
    pub fn new(top_k: usize) -> Self {
        Self {
            history: Vec::new(),
            top_k: top_k.max(1),
        }
    }

    pub fn ask(
        &mut self,
        question: &str,
        index: &ReportIndex,
        llm: &dyn LlmClient,
    ) -> Result<String, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        if index.is_empty() {
            let answer = no_context_response();
            self.record(question, &answer);
            return Ok(answer);
        }

        let chunks = index.retrieve(question, self.top_k)?;
        tracing::debug!(retrieved = chunks.len(), "Retrieved context for question");

        let mut messages = Vec::with_capacity(HISTORY_TURNS + 2);
        messages.push(ChatMessage::system(CONVERSATION_SYSTEM_PROMPT));
        let skip = self.history.len().saturating_sub(HISTORY_TURNS);
        messages.extend(self.history.iter().skip(skip).cloned());
        messages.push(ChatMessage::user(build_question_prompt(question, &chunks)));

        let answer = llm.complete(&messages)?;
        let answer = answer.trim().to_string();
        self.record(question, &answer);
        Ok(answer)
    }

    fn record(&mut self, question: &str, answer: &str) {
        self.history.push(ChatMessage::user(question));
        self.history.push(ChatMessage::assistant(answer));
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RETRIEVAL_TOP_K)
    }
}
