/// Batched embedding generation
use super::{validate_embeddings, EmbeddingProvider, EmbeddingServiceError};
use std::time::Instant;
use tracing::{debug, info};

/// Result of embedding a list of texts
#[derive(Debug)]
pub struct BatchResult {
    /// One vector per input text, in input order
    pub vectors: Vec<Vec<f32>>,
    /// Number of requests sent to the provider
    pub requests: usize,
    pub duration_ms: u64,
}

/// Splits texts into provider-sized batches and embeds them sequentially
///
/// The first failing batch aborts the whole run; nothing partial is returned.
pub struct BatchEmbedder<'a> {
    provider: &'a dyn EmbeddingProvider,
    batch_size: usize,
}

impl<'a> BatchEmbedder<'a> {
    /// `batch_size` is clamped to at least 1
    pub fn new(provider: &'a dyn EmbeddingProvider, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn embed_all(&self, texts: &[String]) -> Result<BatchResult, EmbeddingServiceError> {
        let start = Instant::now();
        let mut vectors = Vec::with_capacity(texts.len());
        let mut requests = 0;

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.provider.embed_batch(batch)?;
            requests += 1;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingServiceError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }

            debug!("Embedded batch of {} texts", batch.len());
            vectors.extend(embeddings);
        }

        // batches must agree on dimension with each other, not only within themselves
        validate_embeddings(&vectors, texts.len())?;

        let duration_ms = start.elapsed().as_millis() as u64;
        if requests > 0 {
            info!(
                "Embedded {} texts with {} in {} requests ({}ms)",
                texts.len(),
                self.provider.model_name(),
                requests,
                duration_ms
            );
        }

        Ok(BatchResult {
            vectors,
            requests,
            duration_ms,
        })
    }
}
