use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, LlmClient};
use super::StructuringError;
use crate::config::AppConfig;

/// Sampling temperature for clinical summaries; low for reproducible output.
const TEMPERATURE: f32 = 0.2;

/// OpenAI-compatible `/chat/completions` client (Together, vLLM, llama.cpp server).
pub struct ChatCompletionClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, StructuringError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Client for the configured endpoint. Fails fast without a credential.
    pub fn from_config(config: &AppConfig) -> Result<Self, StructuringError> {
        let api_key = config.require_api_key()?;
        Self::new(
            &config.llm_base_url,
            api_key,
            &config.llm_model,
            config.llm_timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for /chat/completions
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

/// Response body from /chat/completions
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl LlmClient for ChatCompletionClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, StructuringError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    StructuringError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    StructuringError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    StructuringError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StructuringError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(StructuringError::EmptyResponse)
    }
}

/// Mock LLM client for testing: returns a fixed reply or a fixed failure.
pub struct MockLlmClient {
    reply: Result<String, String>,
    received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            reply: Ok(response.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with a connection error.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far, oldest first.
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, StructuringError> {
        if let Ok(mut calls) = self.received.lock() {
            calls.push(messages.to_vec());
        }
        self.reply
            .clone()
            .map_err(StructuringError::Connection)
    }
}
