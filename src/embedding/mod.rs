/// Embedding generation
///
/// - EmbeddingProvider trait for abstraction over embedding services
/// - OpenAiEmbedder for OpenAI-compatible `/embeddings` endpoints
/// - BatchEmbedder for splitting large inputs into provider-sized requests
mod batch;
mod openai;
mod provider;

pub use batch::{BatchEmbedder, BatchResult};
pub use openai::{parse_embedding_response, OpenAiEmbedder};
pub use provider::{validate_embeddings, EmbeddingProvider, EmbeddingServiceError};

use crate::config::EmbeddingConfig;
use crate::http;
use std::time::Duration;

/// Build the configured embedding client, reading the API key from the environment
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, EmbeddingServiceError> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = http::api_key_from_env(&config.api_key_env)
                .map_err(EmbeddingServiceError::Configuration)?;
            let embedder = OpenAiEmbedder::new(
                &api_key,
                &config.base_url,
                &config.model,
                config.dimensions,
                config.batch_size,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Box::new(embedder))
        }
        other => Err(EmbeddingServiceError::Configuration(format!(
            "Unsupported embedding provider: {}",
            other
        ))),
    }
}
