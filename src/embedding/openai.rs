//! OpenAI-compatible embeddings client

use super::{validate_embeddings, EmbeddingProvider, EmbeddingServiceError};
use crate::http;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocking embeddings client for `POST {base_url}/embeddings`
///
/// Requests are sent once; failures are reported, never retried.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_batch: usize,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: Option<usize>,
        max_batch: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingServiceError> {
        if model.trim().is_empty() {
            return Err(EmbeddingServiceError::Configuration(
                "missing embedding model name".to_string(),
            ));
        }
        if max_batch == 0 {
            return Err(EmbeddingServiceError::Configuration(
                "batch size must be greater than 0".to_string(),
            ));
        }

        let client =
            http::build_client(api_key, timeout).map_err(EmbeddingServiceError::Configuration)?;

        Ok(Self {
            client,
            endpoint: http::endpoint(base_url, "embeddings"),
            model: model.to_string(),
            dimensions,
            max_batch,
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> EmbeddingServiceError {
        if err.is_timeout() {
            EmbeddingServiceError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            EmbeddingServiceError::Network(err.to_string())
        }
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.max_batch {
            return Err(EmbeddingServiceError::InvalidInput(format!(
                "batch of {} exceeds configured max {}",
                texts.len(),
                self.max_batch
            )));
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingServiceError::InvalidInput(
                "Empty text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        tracing::debug!("Requesting {} embeddings from {}", texts.len(), self.endpoint);

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingServiceError::RateLimited(http::error_body(resp)));
        }
        if !status.is_success() {
            return Err(EmbeddingServiceError::Status {
                status: status.as_u16(),
                body: http::error_body(resp),
            });
        }

        let body = resp.text().map_err(|e| self.map_send_error(e))?;
        let vectors = parse_embedding_response(&body)?;
        validate_embeddings(&vectors, texts.len())?;

        if let Some(expected) = self.dimensions {
            if let Some(actual) = vectors.first().map(Vec::len) {
                if actual != expected {
                    return Err(EmbeddingServiceError::DimensionMismatch { expected, actual });
                }
            }
        }

        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parse `{ "data": [{ "index": n, "embedding": [...] }] }` into vectors ordered by index
pub fn parse_embedding_response(body: &str) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingServiceError::MalformedResponse(e.to_string()))?;

    parsed.data.sort_by_key(|entry| entry.index);
    for (position, entry) in parsed.data.iter().enumerate() {
        if entry.index != position {
            return Err(EmbeddingServiceError::MalformedResponse(format!(
                "unexpected embedding index {} at position {}",
                entry.index, position
            )));
        }
    }

    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
