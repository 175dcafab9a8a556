//! Embedding generation over the Ollama embeddings API.

use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use std::future::Future;

use atelier_core::{Error, ModelConfig, Result};

/// A single embedding vector.
pub type Embedding = Vec<f32>;

/// Trait for generating embeddings from text.
///
/// Callers are responsible for batching to the provider's limits and for
/// truncating over-long inputs before calling.
pub trait EmbeddingProvider: Send + Sync {
    /// Ensure the embedding model is available.
    ///
    /// # Errors
    /// Returns an error if the provider is unreachable or the model is not
    /// installed.
    fn ensure_model_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Embed multiple texts in one call, returning one vector per input in
    /// the same order.
    ///
    /// # Errors
    /// Returns a provider error on transport failure or a non-success
    /// response; no vectors are returned for a failed batch.
    fn embed_batch(&self, texts: Vec<String>) -> impl Future<Output = Result<Vec<Embedding>>> + Send;
}

/// Ollama embedding client.
#[derive(Clone)]
pub struct OllamaEmbeddingClient {
    ollama: Ollama,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Creates a client for the configured host and embedding model.
    #[allow(
        deprecated,
        reason = "Ollama::new preserves the exact host/port construction the code relies on"
    )]
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            ollama: Ollama::new(config.ollama_host.clone(), 11434),
            model: config.embedding_model.clone(),
        }
    }

    /// Maps an Ollama error into the shared provider error, special-casing
    /// the missing-model response so the user gets an actionable message.
    fn provider_error(&self, error: &ollama_rs::error::OllamaError) -> Error {
        let detail = format!("{error:?}");
        if detail.contains("model") && detail.contains("not found") {
            Error::Provider(format!(
                "Embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            ))
        } else {
            Error::Provider(format!("Embedding generation failed: {error}"))
        }
    }
}

impl EmbeddingProvider for OllamaEmbeddingClient {
    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.ollama.list_local_models().await.map_err(|error| {
            Error::Provider(format!(
                "Failed to connect to Ollama: {error}. Ensure Ollama is installed and running (ollama serve)"
            ))
        })?;

        if !models.iter().any(|model| model.name.contains(&self.model)) {
            return Err(Error::Provider(format!(
                "Embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            )));
        }

        Ok(())
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::default());
        }

        let expected = texts.len();
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), texts.into());

        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| self.provider_error(&error))?;

        if response.embeddings.len() != expected {
            return Err(Error::InvalidResponse(format!(
                "Expected {expected} embeddings, provider returned {}",
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

/// Test-only fake embedding provider (deterministic, hash-based).
///
/// Produces stable 384-dimension vectors from a content hash so chunking
/// and index tests run without Ollama.
#[cfg(test)]
#[derive(Clone)]
pub struct FakeEmbeddingClient;

#[cfg(test)]
impl EmbeddingProvider for FakeEmbeddingClient {
    async fn ensure_model_available(&self) -> Result<()> {
        Ok(())
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| Self::fake_embedding(text))
            .collect())
    }
}

#[cfg(test)]
impl FakeEmbeddingClient {
    /// Generate a deterministic embedding from a content hash.
    pub fn fake_embedding(text: &str) -> Embedding {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash as _, Hasher as _};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        let mut vector = Vec::with_capacity(384);
        for index in 0..384 {
            let value = ((hash.wrapping_add(index as u64)) % 1000) as f32 / 1000.0;
            vector.push(value);
        }
        vector
    }
}
