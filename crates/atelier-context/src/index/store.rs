use bincode::config::standard as bincode_config;
use bincode::{decode_from_slice, encode_to_vec};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;
use tokio::fs as async_fs;
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use atelier_core::{Error, IgnoreLock as _, IgnoreRwLock as _, IndexProgress, Result};

use crate::index::snapshot::IndexSnapshot;

/// Point-in-time view of the store for status displays.
#[derive(Debug, Clone)]
pub struct IndexStatus {
    /// Whether any chunks are indexed
    pub indexed: bool,
    /// Number of indexed chunks
    pub chunks: usize,
    /// Workspace the snapshot was built from
    pub workspace: PathBuf,
    /// Completion time of the last successful run
    pub indexed_at: Option<SystemTime>,
    /// Whether an index run is currently in flight
    pub is_indexing: bool,
    /// Latest progress report
    pub progress: IndexProgress,
}

/// Owner of the live index snapshot and its persistence.
///
/// Readers take an `Arc` to the current snapshot; an index run builds a
/// replacement off to the side and installs it with a single reference
/// swap, so a concurrent search observes either the fully-old or fully-new
/// index, never a partial one.
pub struct IndexStore {
    /// Live snapshot, swapped whole on replace
    snapshot: RwLock<Arc<IndexSnapshot>>,
    /// Latest progress report from the indexing workflow
    progress: Mutex<IndexProgress>,
    /// In-flight flag guarding against concurrent index runs
    indexing: AtomicBool,
    /// Location of the persisted snapshot
    index_path: PathBuf,
}

impl IndexStore {
    /// Creates a store with an empty snapshot.
    pub fn empty(index_path: PathBuf) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            progress: Mutex::new(IndexProgress::default()),
            indexing: AtomicBool::new(false),
            index_path,
        }
    }

    /// Loads the persisted snapshot from `index_path`.
    ///
    /// Fails soft: a missing or malformed file yields an empty store and a
    /// log line, never an error to the caller.
    pub async fn load(index_path: PathBuf) -> Self {
        let store = Self::empty(index_path);

        let data = match async_fs::read(&store.index_path).await {
            Ok(data) => data,
            Err(_) => {
                info!("No existing index found, starting fresh");
                return store;
            }
        };

        match spawn_blocking(move || {
            decode_from_slice::<IndexSnapshot, _>(&data, bincode_config())
                .map(|(snapshot, _)| snapshot)
        })
        .await
        {
            Ok(Ok(snapshot)) => {
                info!(
                    "Loaded index: {} chunks from {}",
                    snapshot.len(),
                    snapshot.workspace.display()
                );
                store.replace(snapshot);
            }
            Ok(Err(error)) => {
                warn!("Ignoring malformed index file: {error}");
            }
            Err(error) => {
                warn!("Index load task failed: {error}");
            }
        }

        store
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.snapshot.read_ignore_poison())
    }

    /// Installs a new snapshot, replacing the previous one atomically from
    /// the reader's perspective.
    pub fn replace(&self, snapshot: IndexSnapshot) {
        let replacement = Arc::new(snapshot);
        *self.snapshot.write_ignore_poison() = replacement;
    }

    /// Persists the current snapshot to `index_path`.
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails.
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.snapshot();
        let chunk_count = snapshot.len();

        let bytes = spawn_blocking(move || {
            encode_to_vec(snapshot.as_ref(), bincode_config())
                .map_err(|error| Error::Other(format!("Failed to serialize index: {error}")))
        })
        .await
        .map_err(|error| Error::Other(format!("Task join error: {error}")))??;

        if let Some(parent) = self.index_path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(&self.index_path, &bytes).await?;

        info!(
            "Saved index ({chunk_count} chunks, {} bytes) to {}",
            bytes.len(),
            self.index_path.display()
        );
        Ok(())
    }

    /// Reports the store's current status.
    pub fn status(&self) -> IndexStatus {
        let snapshot = self.snapshot();
        IndexStatus {
            indexed: !snapshot.is_empty(),
            chunks: snapshot.len(),
            workspace: snapshot.workspace.clone(),
            indexed_at: snapshot.indexed_at,
            is_indexing: self.indexing.load(Ordering::SeqCst),
            progress: self.progress(),
        }
    }

    /// Latest progress report from the indexing workflow.
    pub fn progress(&self) -> IndexProgress {
        self.progress.lock_ignore_poison().clone()
    }

    /// Location of the persisted snapshot file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Claims the in-flight indexing slot.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyIndexing`] if another run holds the slot;
    /// callers should surface this to the user rather than retry.
    pub(crate) fn begin_indexing(&self) -> Result<()> {
        if self
            .indexing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyIndexing);
        }
        Ok(())
    }

    /// Releases the in-flight indexing slot.
    pub(crate) fn finish_indexing(&self) {
        self.indexing.store(false, Ordering::SeqCst);
    }

    /// Records the latest progress report.
    pub(crate) fn set_progress(&self, progress: IndexProgress) {
        *self.progress.lock_ignore_poison() = progress;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use std::fs;
    use tempfile::TempDir;

    fn sample_snapshot() -> IndexSnapshot {
        let chunk = Chunk {
            file_path: "src/lib.rs".to_owned(),
            start_line: 1,
            end_line: 10,
            text: "// File: src/lib.rs (lines 1-10)\nfn lib() {}".to_owned(),
            raw_text: "fn lib() {}".to_owned(),
        };
        IndexSnapshot {
            workspace: PathBuf::from("/work/project"),
            chunks: vec![chunk],
            embeddings: vec![vec![0.25, -0.5, 0.125]],
            indexed_at: Some(SystemTime::now()),
        }
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.bin");

        let store = IndexStore::empty(path.clone());
        let original = sample_snapshot();
        store.replace(original.clone());
        store.save().await.unwrap();

        let reloaded = IndexStore::load(path).await;
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.chunks, original.chunks);
        assert_eq!(snapshot.embeddings, original.embeddings);
        assert_eq!(snapshot.chunks.len(), snapshot.embeddings.len());
        assert_eq!(snapshot.indexed_at, original.indexed_at);
        assert_eq!(snapshot.workspace, original.workspace);
    }

    #[tokio::test]
    async fn malformed_index_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.bin");
        fs::write(&path, b"definitely not bincode").unwrap();

        let store = IndexStore::load(path).await;
        assert!(store.snapshot().is_empty());
        assert!(!store.status().indexed);
    }

    #[tokio::test]
    async fn missing_index_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::load(temp.path().join("nope.bin")).await;
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn replace_swaps_the_whole_snapshot() {
        let store = IndexStore::empty(PathBuf::from("unused.bin"));
        let before = store.snapshot();
        assert!(before.is_empty());

        store.replace(sample_snapshot());

        let after = store.snapshot();
        assert_eq!(after.len(), 1);
        // The reader that took the old Arc still sees the old data.
        assert!(before.is_empty());
    }

    #[test]
    fn second_begin_indexing_is_rejected() {
        let store = IndexStore::empty(PathBuf::from("unused.bin"));
        assert!(store.begin_indexing().is_ok());

        let second = store.begin_indexing();
        assert!(second.is_err());
        if let Err(error) = second {
            assert!(matches!(error, Error::AlreadyIndexing));
        }

        store.finish_indexing();
        assert!(store.begin_indexing().is_ok(), "Slot frees after finish");
    }
}
