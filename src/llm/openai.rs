//! OpenAI-compatible chat-completions client

use super::{ChatMessage, ChatProvider, GenerationError};
use crate::http;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocking client for `POST {base_url}/chat/completions`
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if model.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "missing chat model name".to_string(),
            ));
        }

        let client = http::build_client(api_key, timeout).map_err(GenerationError::Configuration)?;

        Ok(Self {
            client,
            endpoint: http::endpoint(base_url, "chat/completions"),
            model: model.to_string(),
            temperature,
            max_tokens,
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            GenerationError::Network(err.to_string())
        }
    }
}

impl ChatProvider for OpenAiChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            "Requesting completion from {} ({} messages)",
            self.endpoint,
            messages.len()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited(http::error_body(resp)));
        }
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: http::error_body(resp),
            });
        }

        let body = resp.text().map_err(|e| self.map_send_error(e))?;
        parse_chat_response(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract the first choice's message content from a chat-completions body
pub fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerationError::EmptyResponse)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
