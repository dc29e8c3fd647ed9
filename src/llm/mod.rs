/// Chat-completion services
///
/// - ChatProvider trait for abstraction over chat services
/// - OpenAiChat for OpenAI-compatible `/chat/completions` endpoints
mod openai;

pub use openai::{parse_chat_response, OpenAiChat};

use crate::config::LlmConfig;
use crate::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Chat client configuration invalid: {0}")]
    Configuration(String),

    #[error("Chat request failed: {0}")]
    Network(String),

    #[error("Chat request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Chat service rate limited the request: {0}")]
    RateLimited(String),

    #[error("Chat service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed chat response: {0}")]
    MalformedResponse(String),

    #[error("Chat service returned no answer")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait for chat-completion providers
pub trait ChatProvider {
    /// Send the conversation and return the assistant's reply text
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the configured chat client, reading the API key from the environment
pub fn chat_from_config(config: &LlmConfig) -> Result<Box<dyn ChatProvider>, GenerationError> {
    match config.provider.as_str() {
        "openai" => {
            let api_key =
                http::api_key_from_env(&config.api_key_env).map_err(GenerationError::Configuration)?;
            let chat = OpenAiChat::new(
                &api_key,
                &config.base_url,
                &config.model,
                config.temperature,
                config.max_tokens,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Box::new(chat))
        }
        other => Err(GenerationError::Configuration(format!(
            "Unsupported chat provider: {}",
            other
        ))),
    }
}
