/// Embedding provider trait and service errors
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingServiceError {
    #[error("Embedding client configuration invalid: {0}")]
    Configuration(String),

    #[error("Embedding request failed: {0}")]
    Network(String),

    #[error("Embedding request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Embedding service rate limited the request: {0}")]
    RateLimited(String),

    #[error("Embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Trait for embedding providers
///
/// Ingestion and queries must go through the same provider and model,
/// otherwise similarity scores are meaningless.
pub trait EmbeddingProvider {
    /// Generate embeddings for multiple texts, one vector per input in order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError>;

    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        if vectors.len() != 1 {
            return Err(EmbeddingServiceError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Check that a response holds one non-empty vector per input, all of one dimension
pub fn validate_embeddings(
    vectors: &[Vec<f32>],
    expected_count: usize,
) -> Result<(), EmbeddingServiceError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingServiceError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }

    let Some(first) = vectors.first() else {
        return Ok(());
    };
    if first.is_empty() {
        return Err(EmbeddingServiceError::MalformedResponse(
            "empty embedding vector".to_string(),
        ));
    }

    for vector in vectors {
        if vector.len() != first.len() {
            return Err(EmbeddingServiceError::DimensionMismatch {
                expected: first.len(),
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingServiceError::MalformedResponse(
                "embedding contains non-finite values".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        vectors: Vec<Vec<f32>>,
    }

    impl EmbeddingProvider for FixedProvider {
        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
            Ok(self.vectors.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_embed_single_uses_batch() {
        let provider = FixedProvider {
            vectors: vec![vec![0.5, 0.5]],
        };
        assert_eq!(provider.embed("hello").unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_embed_single_rejects_wrong_count() {
        let provider = FixedProvider {
            vectors: vec![vec![1.0], vec![2.0]],
        };
        let err = provider.embed("hello").unwrap_err();
        assert!(matches!(
            err,
            EmbeddingServiceError::CountMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_validate_embeddings() {
        assert!(validate_embeddings(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).is_ok());
        assert!(validate_embeddings(&[], 0).is_ok());
        assert!(matches!(
            validate_embeddings(&[vec![1.0]], 2),
            Err(EmbeddingServiceError::CountMismatch { .. })
        ));
        assert!(matches!(
            validate_embeddings(&[vec![1.0, 2.0], vec![3.0]], 2),
            Err(EmbeddingServiceError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            validate_embeddings(&[vec![]], 1),
            Err(EmbeddingServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            validate_embeddings(&[vec![f32::NAN]], 1),
            Err(EmbeddingServiceError::MalformedResponse(_))
        ));
    }
}
