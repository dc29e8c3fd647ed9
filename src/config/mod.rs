//! Configuration management for Callsight
//!
//! Loads the TOML configuration, applies `CALLSIGHT_SECTION__KEY` environment
//! overrides and validates the result.

use crate::error::{CallsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub transcripts: TranscriptsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Index storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `index.sqlite`
    pub index_dir: PathBuf,
    /// Name of the single collection stored in the index
    pub collection: String,
}

/// Transcript source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptsConfig {
    pub dir: PathBuf,
}

/// Chunking configuration (characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            overlap: crate::chunking::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    /// Requested output dimension, if the model supports shortening
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

/// Chat-completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Previous chat turns included in the prompt
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            history_turns: 3,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CallsightError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CallsightError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Defaults with environment overrides applied, used when no file exists
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CallsightError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: CALLSIGHT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        let vars: Vec<(String, String)> = std::env::vars().collect();
        self.apply_overrides(vars);
    }

    /// Apply `(name, value)` overrides; names without the prefix are ignored
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("CALLSIGHT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__INDEX_DIR" => self.storage.index_dir = PathBuf::from(value),
            "STORAGE__COLLECTION" => self.storage.collection = value.to_string(),
            "TRANSCRIPTS__DIR" => self.transcripts.dir = PathBuf::from(value),
            "EMBEDDING__BASE_URL" => self.embedding.base_url = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__API_KEY_ENV" => self.embedding.api_key_env = value.to_string(),
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse_value(path, value)?,
            "EMBEDDING__TIMEOUT_SECS" => self.embedding.timeout_secs = parse_value(path, value)?,
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__API_KEY_ENV" => self.llm.api_key_env = value.to_string(),
            "LLM__TEMPERATURE" => self.llm.temperature = parse_value(path, value)?,
            "LLM__MAX_TOKENS" => self.llm.max_tokens = parse_value(path, value)?,
            "LLM__TIMEOUT_SECS" => self.llm.timeout_secs = parse_value(path, value)?,
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_value(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CallsightError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("callsight").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| CallsightError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| CallsightError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            CallsightError::Config("Cannot determine home directory".to_string())
        })?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                index_dir: PathBuf::from("~/.callsight/index"),
                collection: "earnings_transcripts".to_string(),
            },
            transcripts: TranscriptsConfig {
                dir: PathBuf::from("transcripts"),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig {
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "text-embedding-3-small".to_string(),
                dimensions: None,
                batch_size: 100,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
                max_tokens: 500,
                timeout_secs: 30,
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 8;
        config.storage.collection = "q3_calls".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 8);
        assert_eq!(loaded.storage.collection, "q3_calls");
        assert_eq!(loaded.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(CallsightError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_optional_sections_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut value = toml::Value::try_from(Config::default()).unwrap();
        let table = value.as_table_mut().unwrap();
        table.remove("chunking");
        table.remove("retrieval");
        std::fs::write(&path, toml::to_string(&value).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.chunking.overlap, 200);
        assert_eq!(loaded.retrieval.top_k, 5);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vec![
            ("CALLSIGHT_LLM__MODEL".to_string(), "gpt-4o".to_string()),
            ("CALLSIGHT_RETRIEVAL__TOP_K".to_string(), "3".to_string()),
            ("CALLSIGHT_LLM__TEMPERATURE".to_string(), "warm".to_string()),
            ("OTHER_VAR".to_string(), "ignored".to_string()),
        ]);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_expand_path() {
        let plain = expand_path(Path::new("/tmp/index")).unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/index"));

        if let Some(home) = dirs::home_dir() {
            let expanded = expand_path(Path::new("~/.callsight")).unwrap();
            assert_eq!(expanded, home.join(".callsight"));
        }
    }
}
