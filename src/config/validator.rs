use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{CallsightError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CallsightError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.index_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.index_dir",
                "Index directory cannot be empty",
            ));
        }

        let collection = &config.storage.collection;
        let valid_name = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            errors.push(ValidationError::new(
                "storage.collection",
                format!(
                    "Collection name must be non-empty and use [A-Za-z0-9_-], got '{}'",
                    collection
                ),
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if config.chunking.overlap >= config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    config.chunking.overlap, config.chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let embedding = &config.embedding;

        if embedding.provider != "openai" {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!("Provider must be 'openai', got '{}'", embedding.provider),
            ));
        }

        Self::validate_url("embedding.base_url", &embedding.base_url, errors);

        if embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if embedding.batch_size == 0 || embedding.batch_size > 2048 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                format!(
                    "Batch size must be between 1 and 2048, got {}",
                    embedding.batch_size
                ),
            ));
        }

        if embedding.dimensions == Some(0) {
            errors.push(ValidationError::new(
                "embedding.dimensions",
                "Dimensions must be greater than 0 when set",
            ));
        }

        if embedding.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let llm = &config.llm;

        if llm.provider != "openai" {
            errors.push(ValidationError::new(
                "llm.provider",
                format!("Provider must be 'openai', got '{}'", llm.provider),
            ));
        }

        Self::validate_url("llm.base_url", &llm.base_url, errors);

        if llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    llm.temperature
                ),
            ));
        }

        if llm.max_tokens == 0 {
            errors.push(ValidationError::new(
                "llm.max_tokens",
                "Max tokens must be greater than 0",
            ));
        }

        if llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }
    }

    fn validate_url(path: &str, url: &str, errors: &mut Vec<ValidationError>) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                path,
                format!("URL must start with http:// or https://, got '{}'", url),
            ));
        }
    }
}
