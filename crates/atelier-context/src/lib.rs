//! Codebase retrieval engine: discovery, chunking, embedding, and search.
//!
//! The index is a single atomically-swappable snapshot of chunks and their
//! embedding vectors; searches rank chunks by cosine similarity against an
//! embedded query.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Deterministic line-window chunking.
pub mod chunking;
/// Embedding provider trait and the Ollama client.
pub mod embedding;
/// Index snapshot, store, and the indexing workflow.
pub mod index;
/// Workspace file discovery.
pub mod scanner;
/// Cosine-similarity retrieval over the index.
pub mod search;

pub use chunking::{Chunk, chunk_file};
pub use embedding::{Embedding, EmbeddingProvider, OllamaEmbeddingClient};
pub use index::{IndexObserver, IndexSnapshot, IndexStatus, IndexStore, IndexSummary, Indexer};
pub use scanner::collect_files;
pub use search::{RetrievalResult, Retriever, cosine_similarity, format_retrieval_context};
