//! Configuration for indexing, search, models, and memory.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Complete assistant configuration, loadable from `atelier.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Indexing configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Model and endpoint configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Chunking and indexing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Lines per chunk
    pub chunk_size: usize,
    /// Lines of overlap between consecutive chunks
    pub chunk_overlap: usize,
    /// Minimum trimmed character count for a window to become a chunk
    pub min_chunk_chars: usize,
    /// Files larger than this many bytes are excluded from indexing
    pub max_file_size: u64,
    /// Number of chunks embedded per provider call
    pub embed_batch_size: usize,
    /// Maximum characters of a chunk sent to the embedding provider
    pub embed_input_cap: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: 60,
            chunk_overlap: 10,
            min_chunk_chars: 20,
            max_file_size: 500 * 1024,
            embed_batch_size: 100,
            embed_input_cap: 8000,
        }
    }
}

impl IndexConfig {
    /// Validates the chunking parameters.
    ///
    /// # Errors
    /// Returns a configuration error if the overlap is not smaller than the
    /// chunk size, which would make the chunking stride zero or negative.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Chunking stride in lines.
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }
}

/// Retrieval ranking parameters.
///
/// The floor and admission values mirror the behavior observed in
/// production; they are defaults, not constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results returned by a search
    pub top_k: usize,
    /// Minimum cosine similarity for a result to be returned
    pub min_score: f32,
    /// Maximum accepted results per file once the admission window is past
    pub per_file_cap: usize,
    /// Number of initial results admitted regardless of file diversity
    pub always_admit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.3,
            per_file_cap: 1,
            always_admit: 2,
        }
    }
}

/// Model names and the Ollama endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama service
    pub ollama_host: String,
    /// Chat model used for generation
    pub chat_model: String,
    /// Embedding model used for indexing and search
    pub embedding_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost:11434".to_owned(),
            chat_model: "qwen2.5-coder:7b".to_owned(),
            embedding_model: "nomic-embed-text".to_owned(),
        }
    }
}

/// Memory store limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of retained facts
    pub max_facts: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { max_facts: 100 }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Loads configuration from the given file if present, falling back to
    /// defaults on a missing or malformed file, then applies environment
    /// overrides.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(file) if file.exists() => Self::load(file).unwrap_or_else(|error| {
                tracing::warn!("Ignoring malformed config {}: {error}", file.display());
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env();
        config
    }

    /// Applies environment overrides for the Ollama endpoint and chat model.
    fn apply_env(&mut self) {
        if let Ok(host) = env::var("OLLAMA_HOST")
            && !host.is_empty()
        {
            self.models.ollama_host = host;
        }
        if let Ok(model) = env::var("OLLAMA_MODEL")
            && !model.is_empty()
        {
            self.models.chat_model = model;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunking_is_valid() {
        let config = IndexConfig::default();
        assert!(config.validate().is_ok(), "Defaults should validate");
        assert_eq!(config.stride(), 50);
    }

    #[test]
    fn overlap_at_least_chunk_size_is_rejected() {
        let config = IndexConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..IndexConfig::default()
        };
        let result = config.validate();
        assert!(result.is_err(), "Equal overlap should be rejected");
        if let Err(error) = result {
            assert!(matches!(error, Error::Config(_)), "Should be Config error");
        }
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[search]\ntop_k = 8\n").unwrap_or_default();
        assert_eq!(parsed.search.top_k, 8);
        assert_eq!(parsed.index.chunk_size, 60, "Missing sections use defaults");
        assert!((parsed.search.min_score - 0.3).abs() < f32::EPSILON);
    }
}
