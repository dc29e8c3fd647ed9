use crate::llm::GenerationError;
use crate::embedding::EmbeddingServiceError;
use crate::loader::LoadError;
use crate::storage::IndexError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Callsight
#[derive(Error, Debug)]
pub enum CallsightError {
    /// Transcript directory or file could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Embedding service call failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingServiceError),

    /// Vector index is empty, missing, corrupted or inconsistent
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Chat-completion service call failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {}", format_validation_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },
}

impl CallsightError {
    /// Short error kind name reported by the command line
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "LoadError",
            Self::Embedding(_) => "EmbeddingServiceError",
            Self::Index(_) => "IndexError",
            Self::Generation(_) => "GenerationError",
            Self::Config(_)
            | Self::ConfigValidation { .. }
            | Self::ConfigNotFound { .. }
            | Self::InvalidConfigValue { .. }
            | Self::Toml(_)
            | Self::TomlSerialization(_) => "ConfigError",
            Self::Io { .. } => "IoError",
            Self::Json { .. } => "JsonError",
        }
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Callsight operations
pub type Result<T> = std::result::Result<T, CallsightError>;
