use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs as async_fs;
use tracing::{debug, warn};

use atelier_core::{IndexConfig, IndexPhase, IndexProgress, Result, truncate_chars};

use crate::chunking::{Chunk, chunk_file};
use crate::embedding::EmbeddingProvider;
use crate::index::snapshot::IndexSnapshot;
use crate::index::store::IndexStore;
use crate::scanner::collect_files;

/// Observer invoked with a progress report at each phase transition and at
/// each embedding batch boundary.
pub type IndexObserver = Arc<dyn Fn(&IndexProgress) + Send + Sync>;

/// Counts from a completed index run.
#[derive(Debug, Clone, Copy)]
pub struct IndexSummary {
    /// Files discovered and chunked
    pub files: usize,
    /// Chunks embedded and installed
    pub chunks: usize,
}

/// The indexing workflow: discovery, chunking, batched embedding, and
/// atomic snapshot installation.
///
/// One run may be active per store at a time; a second invocation fails
/// fast instead of queuing. A failed run leaves the previous snapshot
/// untouched.
pub struct Indexer<E: EmbeddingProvider + Clone> {
    store: Arc<IndexStore>,
    client: E,
    config: IndexConfig,
}

impl<E: EmbeddingProvider + Clone> Indexer<E> {
    /// Creates an indexer over the given store and embedding client.
    pub fn new(store: Arc<IndexStore>, client: E, config: IndexConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Indexes the workspace rooted at `root`, replacing the live snapshot
    /// on success and persisting it.
    ///
    /// # Errors
    /// Returns [`atelier_core::Error::AlreadyIndexing`] when a run is
    /// already in flight, a configuration error for invalid chunking
    /// parameters, and a provider error if an embedding batch fails — in
    /// which case the previous snapshot stays installed.
    pub async fn index_workspace(
        &self,
        root: &Path,
        observer: Option<IndexObserver>,
    ) -> Result<IndexSummary> {
        self.config.validate()?;
        self.store.begin_indexing()?;

        let outcome = self.run(root, observer.as_ref()).await;
        if let Err(error) = &outcome {
            self.notify(
                observer.as_ref(),
                IndexProgress::phase(IndexPhase::Error, error.to_string()),
            );
        }
        self.store.finish_indexing();
        outcome
    }

    /// Executes the scanning and embedding phases.
    async fn run(&self, root: &Path, observer: Option<&IndexObserver>) -> Result<IndexSummary> {
        self.notify(
            observer,
            IndexProgress::phase(IndexPhase::Scanning, "Scanning workspace files..."),
        );

        let files = collect_files(root, self.config.max_file_size);
        self.notify(
            observer,
            IndexProgress::phase(
                IndexPhase::Scanning,
                format!("Found {} files to index", files.len()),
            ),
        );

        let chunks = self.chunk_files(&files).await?;
        let embeddings = self.embed_chunks(&chunks, observer).await?;

        let snapshot = IndexSnapshot {
            workspace: root.to_path_buf(),
            chunks,
            embeddings,
            indexed_at: Some(SystemTime::now()),
        };
        let summary = IndexSummary {
            files: files.len(),
            chunks: snapshot.len(),
        };

        self.store.replace(snapshot);
        if let Err(error) = self.store.save().await {
            // The new snapshot is live in memory; the next successful run
            // will persist again.
            warn!("Failed to persist index: {error}");
        }

        self.notify(
            observer,
            IndexProgress::phase(
                IndexPhase::Done,
                format!(
                    "Indexed {} chunks from {} files",
                    summary.chunks, summary.files
                ),
            ),
        );

        Ok(summary)
    }

    /// Chunks every discovered file. Unreadable files contribute zero
    /// chunks; one bad file cannot abort the run.
    async fn chunk_files(&self, files: &[PathBuf]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for path in files {
            let content = match async_fs::read_to_string(path).await {
                Ok(content) => content,
                Err(error) => {
                    debug!("Skipping unreadable file {}: {error}", path.display());
                    continue;
                }
            };
            chunks.extend(chunk_file(
                &path.display().to_string(),
                &content,
                &self.config,
            )?);
        }
        Ok(chunks)
    }

    /// Embeds chunks in fixed-size sequential batches, reporting progress
    /// after each batch. A batch failure aborts the run.
    async fn embed_chunks(
        &self,
        chunks: &[Chunk],
        observer: Option<&IndexObserver>,
    ) -> Result<Vec<Vec<f32>>> {
        let total = chunks.len() as u64;
        self.notify(
            observer,
            IndexProgress::batch(format!("Embedding {total} code chunks..."), 0, total),
        );

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.config.embed_batch_size) {
            let texts: Vec<String> = batch
                .iter()
                .map(|chunk| truncate_chars(&chunk.text, self.config.embed_input_cap).into_owned())
                .collect();

            embeddings.extend(self.client.embed_batch(texts).await?);

            let done = embeddings.len() as u64;
            self.notify(
                observer,
                IndexProgress::batch(format!("Embedded {done}/{total} chunks"), done, total),
            );
        }
        Ok(embeddings)
    }

    /// Records progress on the store and forwards it to the observer. An
    /// observer panic is contained and logged; it never aborts indexing.
    fn notify(&self, observer: Option<&IndexObserver>, progress: IndexProgress) {
        self.store.set_progress(progress.clone());
        if let Some(callback) = observer
            && catch_unwind(AssertUnwindSafe(|| callback(&progress))).is_err()
        {
            warn!("Index progress observer panicked; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::FakeEmbeddingClient;
    use atelier_core::Error;
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Embedding provider whose batches always fail, for abort-path tests.
    #[derive(Clone)]
    struct FailingEmbeddingClient;

    impl EmbeddingProvider for FailingEmbeddingClient {
        async fn ensure_model_available(&self) -> Result<()> {
            Ok(())
        }

        async fn embed_batch(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Err(Error::Provider("embedding backend unavailable".to_owned()))
        }
    }

    fn workspace_with_two_files() -> TempDir {
        let temp = TempDir::new().unwrap();
        let long: String = (1..=80)
            .map(|number| format!("value_{number} = compute({number})"))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(temp.path().join("a.py"), long).unwrap();
        fs::write(temp.path().join("b.py"), "x=1\ny=2\n\n\n").unwrap();
        temp
    }

    fn indexer_for(
        temp: &TempDir,
    ) -> (Arc<IndexStore>, Indexer<FakeEmbeddingClient>) {
        let store = Arc::new(IndexStore::empty(temp.path().join("index.bin")));
        let indexer = Indexer::new(
            Arc::clone(&store),
            FakeEmbeddingClient,
            atelier_core::IndexConfig::default(),
        );
        (store, indexer)
    }

    #[tokio::test]
    async fn workspace_indexes_into_expected_chunks() {
        let temp = workspace_with_two_files();
        let (store, indexer) = indexer_for(&temp);

        let summary = indexer.index_workspace(temp.path(), None).await.unwrap();

        // a.py (80 lines) chunks at stride 50 into 1-60 and 51-80; b.py is
        // below the minimum length threshold and contributes nothing.
        assert_eq!(summary.files, 2);
        assert_eq!(summary.chunks, 2);

        let status = store.status();
        assert!(status.indexed);
        assert_eq!(status.chunks, 2);
        assert!(status.indexed_at.is_some());
        assert!(!status.is_indexing);
        assert_eq!(status.progress.status, IndexPhase::Done);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.chunks.len(), snapshot.embeddings.len());
        assert_eq!(
            (snapshot.chunks[0].start_line, snapshot.chunks[0].end_line),
            (1, 60)
        );
        assert_eq!(
            (snapshot.chunks[1].start_line, snapshot.chunks[1].end_line),
            (51, 80)
        );
    }

    #[tokio::test]
    async fn concurrent_run_is_rejected_without_touching_snapshot() {
        let temp = workspace_with_two_files();
        let (store, indexer) = indexer_for(&temp);

        // Simulate an in-flight run holding the slot.
        store.begin_indexing().unwrap();
        let result = indexer.index_workspace(temp.path(), None).await;

        assert!(result.is_err());
        if let Err(error) = result {
            assert!(matches!(error, Error::AlreadyIndexing));
        }
        assert!(store.snapshot().is_empty(), "Snapshot must be unchanged");
        store.finish_indexing();
    }

    #[tokio::test]
    async fn batch_failure_aborts_and_preserves_previous_snapshot() {
        let temp = workspace_with_two_files();
        let store = Arc::new(IndexStore::empty(temp.path().join("index.bin")));

        // Seed a previous snapshot to prove it survives the failed run.
        let previous = IndexSnapshot {
            workspace: PathBuf::from("/previous"),
            chunks: Vec::new(),
            embeddings: Vec::new(),
            indexed_at: Some(SystemTime::now()),
        };
        store.replace(previous.clone());

        let indexer = Indexer::new(
            Arc::clone(&store),
            FailingEmbeddingClient,
            atelier_core::IndexConfig::default(),
        );
        let result = indexer.index_workspace(temp.path(), None).await;

        assert!(result.is_err());
        if let Err(error) = result {
            assert!(matches!(error, Error::Provider(_)));
        }
        assert_eq!(store.snapshot().workspace, previous.workspace);
        assert_eq!(store.progress().status, IndexPhase::Error);
        assert!(!store.status().is_indexing, "Slot must be released");
    }

    #[tokio::test]
    async fn observer_sees_phases_and_batch_boundaries() {
        let temp = workspace_with_two_files();
        let (_store, indexer) = indexer_for(&temp);

        let seen: Arc<Mutex<Vec<IndexProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: IndexObserver = Arc::new(move |progress| {
            if let Ok(mut events) = sink.lock() {
                events.push(progress.clone());
            }
        });

        indexer
            .index_workspace(temp.path(), Some(observer))
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        let phases: Vec<IndexPhase> = events.iter().map(|event| event.status).collect();
        assert!(phases.contains(&IndexPhase::Scanning));
        assert!(phases.contains(&IndexPhase::Embedding));
        assert_eq!(phases.last(), Some(&IndexPhase::Done));

        let final_batch = events
            .iter()
            .rev()
            .find(|event| event.status == IndexPhase::Embedding)
            .cloned();
        assert!(final_batch.is_some());
        if let Some(batch) = final_batch {
            assert_eq!(batch.done, Some(2));
            assert_eq!(batch.total, Some(2));
        }
    }

    #[tokio::test]
    async fn panicking_observer_does_not_abort_the_run() {
        let temp = workspace_with_two_files();
        let (store, indexer) = indexer_for(&temp);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let observer: IndexObserver = Arc::new(move |_progress| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("observer bug");
        });

        let summary = indexer
            .index_workspace(temp.path(), Some(observer))
            .await
            .unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(store.status().chunks, 2);
        assert!(calls.load(Ordering::SeqCst) > 1, "Observer kept being called");
    }
}
