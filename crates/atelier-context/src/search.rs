//! Cosine-similarity retrieval over the index snapshot.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use atelier_core::{SearchConfig, truncate_chars};

use crate::chunking::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::index::IndexStore;

/// Guards the cosine denominator against a zero vector.
const SIMILARITY_EPSILON: f32 = 1e-10;

/// Maximum characters of a query sent to the embedding provider.
const QUERY_EMBED_CAP: usize = 8000;

/// A retrieved chunk and its similarity to the query, in [-1, 1].
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity between the query and the chunk
    pub score: f32,
}

/// Ranks indexed chunks against an embedded query.
pub struct Retriever<E: EmbeddingProvider + Clone> {
    store: Arc<IndexStore>,
    client: E,
    config: SearchConfig,
}

impl<E: EmbeddingProvider + Clone> Retriever<E> {
    /// Creates a retriever over the given store and embedding client.
    pub fn new(store: Arc<IndexStore>, client: E, config: SearchConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Returns up to `top_k` results, best first.
    ///
    /// Retrieval is best-effort: an empty index returns an empty result
    /// without an embedding call, and a query-embedding failure degrades to
    /// an empty result rather than aborting the surrounding chat flow.
    /// Fewer than `top_k` results — or none — is valid whenever no chunk
    /// clears the relevance floor.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        let snapshot = self.store.snapshot();
        if snapshot.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_text = truncate_chars(query, QUERY_EMBED_CAP).into_owned();
        let query_vector = match self.client.embed_batch(vec![query_text]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(_) => {
                warn!("Embedding provider returned no vector for the query");
                return Vec::new();
            }
            Err(error) => {
                warn!("Search failed to embed query: {error}");
                return Vec::new();
            }
        };

        let mut scored: Vec<(usize, f32)> = snapshot
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, cosine_similarity(&query_vector, vector)))
            .collect();
        scored.sort_by(|first, second| {
            second.1.partial_cmp(&first.1).unwrap_or(Ordering::Equal)
        });

        // Per-file diversity cap: one file must not dominate the results,
        // but the first few accepted results are admitted unconditionally
        // so a single-file match still returns something.
        let mut per_file: HashMap<&str, usize> = HashMap::new();
        let mut results = Vec::new();
        for (position, score) in scored {
            let chunk = &snapshot.chunks[position];
            let accepted = per_file.entry(chunk.file_path.as_str()).or_insert(0);
            if results.len() >= self.config.always_admit && *accepted >= self.config.per_file_cap {
                continue;
            }
            *accepted += 1;
            results.push(RetrievalResult {
                chunk: chunk.clone(),
                score,
            });
            if results.len() >= top_k {
                break;
            }
        }

        results.retain(|result| result.score > self.config.min_score);
        results
    }
}

/// Cosine similarity between two vectors: `dot / (|a|·|b| + ε)`.
///
/// Mismatched dimensions score 0; the ε keeps a zero vector from dividing
/// by zero. Vectors are compared as stored — they are not re-normalized.
pub fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    if vector_a.len() != vector_b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut magnitude_a = 0.0_f32;
    let mut magnitude_b = 0.0_f32;
    for (component_a, component_b) in vector_a.iter().zip(vector_b.iter()) {
        dot += component_a * component_b;
        magnitude_a += component_a * component_a;
        magnitude_b += component_b * component_b;
    }

    dot / (magnitude_a.sqrt() * magnitude_b.sqrt() + SIMILARITY_EPSILON)
}

/// Formats retrieval results as a context block for the system prompt.
///
/// Each entry is tagged with its file path, line range, and relevance
/// percentage; the chunk body appears without its embedding header.
pub fn format_retrieval_context(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = results
        .iter()
        .map(|result| {
            format!(
                "### {} (lines {}-{}, relevance: {:.0}%)\n```\n{}\n```",
                result.chunk.file_path,
                result.chunk.start_line,
                result.chunk.end_line,
                f64::from(result.score) * 100.0,
                result.chunk.raw_text
            )
        })
        .collect();

    format!(
        "## Relevant code from your codebase:\n\n{}",
        parts.join("\n\n")
    )
}
