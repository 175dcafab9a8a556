use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::chunking::Chunk;
use crate::embedding::Embedding;

/// The complete state of the retrieval index at one point in time.
///
/// `chunks` and `embeddings` are positionally aligned: the vector at an
/// index embeds the chunk at the same index. A snapshot is built off to the
/// side by an index run and installed whole; it is never mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct IndexSnapshot {
    /// Root of the indexed workspace
    pub workspace: PathBuf,
    /// Indexed chunks, in discovery order
    pub chunks: Vec<Chunk>,
    /// Embedding vectors, parallel to `chunks`
    pub embeddings: Vec<Embedding>,
    /// Completion time of the run that produced this snapshot
    pub indexed_at: Option<SystemTime>,
}

impl IndexSnapshot {
    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the snapshot holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
