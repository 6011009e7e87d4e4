//! In-memory vector index with exact cosine-similarity ranking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use lore_core::document::SearchMatch;
use lore_core::error::{LoreError, Result};
use lore_core::store::DocumentStore;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude, never a division fault.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A single indexed document: only what ranking and display need.
#[derive(Debug, Clone)]
struct IndexEntry {
    document_id: String,
    embedding: Vec<f32>,
    title: String,
}

/// One complete build of the index: entries in insertion order plus an
/// id → slot lookup. Removals leave a `None` slot so the insertion ranks of
/// the survivors stay fixed; slots are reclaimed by the next full rebuild.
#[derive(Debug, Default)]
struct Generation {
    entries: Vec<Option<IndexEntry>>,
    slots: HashMap<String, usize>,
    live: usize,
}

impl Generation {
    fn upsert(&mut self, entry: IndexEntry) {
        match self.slots.get(&entry.document_id).copied() {
            // Overwrite in place: the entry keeps its original insertion rank.
            Some(slot) => self.entries[slot] = Some(entry),
            None => {
                self.slots.insert(entry.document_id.clone(), self.entries.len());
                self.entries.push(Some(entry));
                self.live += 1;
            }
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.slots.remove(id) {
            Some(slot) => {
                self.entries[slot] = None;
                self.live -= 1;
                true
            }
            None => false,
        }
    }
}

/// Index lifecycle. `Refreshing` keeps the previous generation serving reads
/// until the replacement is swapped in whole.
#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(Generation),
    Refreshing(Generation),
}

impl State {
    fn generation(&self) -> Option<&Generation> {
        match self {
            State::Uninitialized => None,
            State::Ready(generation) | State::Refreshing(generation) => Some(generation),
        }
    }

    fn generation_mut(&mut self) -> Option<&mut Generation> {
        match self {
            State::Uninitialized => None,
            State::Ready(generation) | State::Refreshing(generation) => Some(generation),
        }
    }
}

/// Exclusive owner of the in-memory id → embedding mapping.
///
/// The index is a cache over the [`DocumentStore`]; it can be rebuilt
/// wholesale at any time and is never the system of record. Reads run fully
/// concurrently; writes are exclusive and atomic — a reader observes an
/// entry either before or after a write, never partially. `initialize` and
/// `refresh` build the replacement generation off-lock and swap it in whole,
/// so a failed rebuild leaves the previous generation serving.
///
/// Ranking is an exact linear scan: every [`search`](VectorIndex::search) is
/// O(entries × dimension). That is a deliberate ceiling chosen for corpora
/// of thousands of documents; an approximate index would change result
/// semantics.
pub struct VectorIndex {
    store: Arc<dyn DocumentStore>,
    dimensions: usize,
    state: RwLock<State>,
    /// Serializes rebuilds so concurrent first-use initializations coalesce
    /// into a single load instead of racing.
    rebuild: Mutex<()>,
}

impl VectorIndex {
    /// Create an uninitialized index over `store` for `dimensions`-length
    /// embeddings.
    pub fn new(store: Arc<dyn DocumentStore>, dimensions: usize) -> Self {
        Self { store, dimensions, state: RwLock::new(State::Uninitialized), rebuild: Mutex::new(()) }
    }

    /// The embedding dimension this index accepts.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Rebuild the index from every stored document that carries a
    /// correctly-dimensioned embedding.
    ///
    /// Idempotent: a successful call fully replaces prior state.
    ///
    /// # Errors
    ///
    /// Propagates the store failure (typically
    /// [`LoreError::StoreUnavailable`]); the previous generation, if any,
    /// keeps serving unchanged.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.rebuild.lock().await;
        self.rebuild_locked().await
    }

    /// Initialize only if the index has never been populated.
    ///
    /// Concurrent callers coalesce: one load runs, the rest await it on the
    /// rebuild guard and return once a generation is in place.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized().await {
            return Ok(());
        }
        let _guard = self.rebuild.lock().await;
        if self.state.read().await.generation().is_some() {
            // Another caller finished the load while we waited.
            return Ok(());
        }
        self.rebuild_locked().await
    }

    /// Equivalent to marking the index stale and initializing again; used
    /// after bulk ingestion.
    pub async fn refresh(&self) -> Result<()> {
        self.initialize().await
    }

    async fn rebuild_locked(&self) -> Result<()> {
        // Mark the rebuild without disturbing the serving generation.
        {
            let mut state = self.state.write().await;
            if let State::Ready(generation) = std::mem::replace(&mut *state, State::Uninitialized)
            {
                *state = State::Refreshing(generation);
            }
        }

        // Load off-lock; readers keep hitting the previous generation.
        let records = match self.store.load_all_with_embeddings().await {
            Ok(records) => records,
            Err(e) => {
                let mut state = self.state.write().await;
                if let State::Refreshing(generation) =
                    std::mem::replace(&mut *state, State::Uninitialized)
                {
                    *state = State::Ready(generation);
                }
                warn!(error = %e, "index rebuild failed, keeping previous generation");
                return Err(e);
            }
        };

        let mut generation = Generation::default();
        for record in records {
            let Some(embedding) = record.embedding else {
                warn!(document.id = %record.id, "store returned a document without an embedding, skipping");
                continue;
            };
            if embedding.len() != self.dimensions {
                warn!(
                    document.id = %record.id,
                    expected = self.dimensions,
                    actual = embedding.len(),
                    "skipping document with a wrong-dimension embedding"
                );
                continue;
            }
            generation.upsert(IndexEntry { document_id: record.id, embedding, title: record.title });
        }

        let count = generation.live;
        *self.state.write().await = State::Ready(generation);
        info!(documents = count, dimensions = self.dimensions, "vector index rebuilt");
        Ok(())
    }

    /// Rank every indexed document against `query_embedding` and return at
    /// most `k` matches scoring at least `min_score`, ordered by descending
    /// cosine similarity. Equal scores keep insertion order (first-indexed
    /// wins), so results are deterministic. Nothing clearing the threshold is
    /// an empty list, not an error.
    ///
    /// Full linear scan: O(entries × dimension) per call.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::DimensionMismatch`] if the query vector is not
    /// `dimensions()` long.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchMatch>> {
        if query_embedding.len() != self.dimensions {
            return Err(LoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_embedding.len(),
            });
        }

        let state = self.state.read().await;
        let Some(generation) = state.generation() else {
            debug!("search on an uninitialized index, nothing to rank");
            return Ok(Vec::new());
        };

        let mut matches: Vec<SearchMatch> = generation
            .entries
            .iter()
            .flatten()
            .filter_map(|entry| {
                let score = cosine_similarity(&entry.embedding, query_embedding);
                (score >= min_score).then(|| SearchMatch {
                    document_id: entry.document_id.clone(),
                    score,
                    title: entry.title.clone(),
                })
            })
            .collect();

        // Stable sort keeps insertion order between equal scores.
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(k);
        Ok(matches)
    }

    /// Insert or overwrite the entry for `id`.
    ///
    /// Overwriting keeps the entry's original insertion rank, so score ties
    /// resolve the same way before and after a re-embed. On an index that
    /// was never initialized this is a recorded no-op: the store is the
    /// system of record and the entry arrives with the first load.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::DimensionMismatch`] (without mutating anything)
    /// if the vector is not `dimensions()` long.
    pub async fn upsert(
        &self,
        id: impl Into<String>,
        embedding: Vec<f32>,
        title: impl Into<String>,
    ) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(LoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        let id = id.into();
        let mut state = self.state.write().await;
        match state.generation_mut() {
            Some(generation) => {
                generation.upsert(IndexEntry { document_id: id, embedding, title: title.into() });
            }
            None => {
                debug!(document.id = %id, "upsert before initialization, deferred to the next load");
            }
        }
        Ok(())
    }

    /// Remove the entry for `id` if present. Removing an absent id is not an
    /// error.
    pub async fn remove(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(generation) = state.generation_mut() {
            if generation.remove(id) {
                debug!(document.id = %id, "removed from index");
            }
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.generation().map_or(0, |g| g.live)
    }

    /// Whether the index holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a generation has been loaded and is serving reads.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.generation().is_some()
    }

    /// Rough in-memory size of the stored vectors. Purely informational:
    /// live entries × dimension × 4 bytes.
    pub async fn memory_footprint_bytes(&self) -> usize {
        self.len().await * self.dimensions * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use lore_core::document::DocumentRecord;
    use lore_core::memory::MemoryDocumentStore;

    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A store whose reachability can be flipped off between calls, counting
    /// full loads.
    struct FlakyStore {
        inner: MemoryDocumentStore,
        available: AtomicBool,
        loads: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: MemoryDocumentStore) -> Self {
            Self { inner, available: AtomicBool::new(true), loads: AtomicUsize::new(0) }
        }

        fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<()> {
            if self.available.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(LoreError::StoreUnavailable("store offline".to_string()))
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn load_all_with_embeddings(&self) -> Result<Vec<DocumentRecord>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.load_all_with_embeddings().await
        }

        async fn load_by_id(&self, id: &str) -> Result<DocumentRecord> {
            self.check()?;
            self.inner.load_by_id(id).await
        }

        async fn save(&self, record: &DocumentRecord) -> Result<()> {
            self.check()?;
            self.inner.save(record).await
        }

        async fn find_missing_or_stale(&self, current_version: &str) -> Result<Vec<String>> {
            self.check()?;
            self.inner.find_missing_or_stale(current_version).await
        }
    }

    fn embedded(id: &str, title: &str, embedding: Vec<f32>) -> DocumentRecord {
        DocumentRecord {
            embedding: Some(embedding),
            embedding_version: Some("v1".to_string()),
            embedded_at: Some(Utc::now()),
            ..DocumentRecord::new(id, title, "body", "wiki")
        }
    }

    async fn seeded_index() -> Arc<VectorIndex> {
        let store = MemoryDocumentStore::new();
        store
            .insert_all([
                embedded("a", "first", vec![1.0, 0.0]),
                embedded("b", "second", vec![0.0, 1.0]),
                embedded("c", "third", vec![0.9, 0.1]),
            ])
            .await;
        let index = Arc::new(VectorIndex::new(Arc::new(store), 2));
        index.initialize().await.unwrap();
        index
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_and_drops_below_threshold() {
        let index = seeded_index().await;

        let matches = index.search(&[1.0, 0.0], 2, 0.5).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(matches[0].score > matches[1].score);
        assert!(matches.iter().all(|m| m.score >= 0.5));
    }

    #[tokio::test]
    async fn search_returns_empty_when_nothing_clears_the_threshold() {
        let index = seeded_index().await;
        let matches = index.search(&[-1.0, 0.0], 10, 0.5).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let store = MemoryDocumentStore::new();
        let index = VectorIndex::new(Arc::new(store), 2);
        index.initialize().await.unwrap();

        // Identical embeddings, inserted in a known order.
        index.upsert("late", vec![1.0, 0.0], "late").await.unwrap();
        index.upsert("later", vec![1.0, 0.0], "later").await.unwrap();

        let matches = index.search(&[1.0, 0.0], 10, 0.0).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.document_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "later"]);
    }

    #[tokio::test]
    async fn overwrite_keeps_the_original_insertion_rank() {
        let store = MemoryDocumentStore::new();
        let index = VectorIndex::new(Arc::new(store), 2);
        index.initialize().await.unwrap();

        index.upsert("x", vec![1.0, 0.0], "x").await.unwrap();
        index.upsert("y", vec![1.0, 0.0], "y").await.unwrap();
        // Re-embed "x" with an identical vector; it should still sort first.
        index.upsert("x", vec![1.0, 0.0], "x2").await.unwrap();

        let matches = index.search(&[1.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(matches[0].document_id, "x");
        assert_eq!(matches[0].title, "x2");
        assert_eq!(matches[1].document_id, "y");
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn upsert_then_search_finds_the_document_on_top() {
        let index = seeded_index().await;
        index.upsert("d", vec![0.6, 0.8], "fourth").await.unwrap();

        let matches = index.search(&[0.6, 0.8], 1, 0.0).await.unwrap();
        assert_eq!(matches[0].document_id, "d");
        assert!((matches[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn removed_documents_never_come_back() {
        let index = seeded_index().await;
        index.remove("a").await;
        index.remove("a").await; // idempotent

        let matches = index.search(&[1.0, 0.0], 10, 0.0).await.unwrap();
        assert!(matches.iter().all(|m| m.document_id != "a"));
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_without_mutation() {
        let index = seeded_index().await;

        let err = index.search(&[1.0, 0.0, 0.0], 10, 0.0).await.unwrap_err();
        assert!(matches!(err, LoreError::DimensionMismatch { expected: 2, actual: 3 }));

        let err = index.upsert("bad", vec![1.0], "bad").await.unwrap_err();
        assert!(matches!(err, LoreError::DimensionMismatch { expected: 2, actual: 1 }));
        assert_eq!(index.len().await, 3);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_generation() {
        let inner = MemoryDocumentStore::new();
        inner
            .insert_all((0..5).map(|i| embedded(&format!("d{i}"), "doc", vec![1.0, 0.0])))
            .await;
        let store = Arc::new(FlakyStore::new(inner));
        let index = VectorIndex::new(store.clone(), 2);

        index.initialize().await.unwrap();
        assert_eq!(index.len().await, 5);

        store.set_available(false);
        let err = index.refresh().await.unwrap_err();
        assert!(matches!(err, LoreError::StoreUnavailable(_)));

        // No partial clear: the prior generation still serves.
        assert!(index.is_initialized().await);
        assert_eq!(index.len().await, 5);
        let matches = index.search(&[1.0, 0.0], 10, 0.5).await.unwrap();
        assert_eq!(matches.len(), 5);
    }

    #[tokio::test]
    async fn initialize_replaces_prior_state_wholesale() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert_all([embedded("a", "first", vec![1.0, 0.0])]).await;
        let index = VectorIndex::new(store.clone(), 2);
        index.initialize().await.unwrap();

        // An entry that only ever existed in the index, not the store.
        index.upsert("ghost", vec![0.0, 1.0], "ghost").await.unwrap();
        assert_eq!(index.len().await, 2);

        store.insert_all([embedded("b", "second", vec![0.0, 1.0])]).await;
        index.initialize().await.unwrap();

        // Full replace, no merge: the ghost is gone, the store wins.
        assert_eq!(index.len().await, 2);
        let matches = index.search(&[0.0, 1.0], 10, 0.9).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_id, "b");
    }

    #[tokio::test]
    async fn wrong_dimension_records_are_skipped_at_load() {
        let store = MemoryDocumentStore::new();
        store
            .insert_all([
                embedded("good", "good", vec![1.0, 0.0]),
                embedded("bad", "bad", vec![1.0, 0.0, 0.0]),
            ])
            .await;
        let index = VectorIndex::new(Arc::new(store), 2);
        index.initialize().await.unwrap();

        assert_eq!(index.len().await, 1);
        let matches = index.search(&[1.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(matches[0].document_id, "good");
    }

    #[tokio::test]
    async fn uninitialized_index_reports_empty_observability() {
        let index = VectorIndex::new(Arc::new(MemoryDocumentStore::new()), 2);
        assert!(!index.is_initialized().await);
        assert_eq!(index.len().await, 0);
        assert_eq!(index.memory_footprint_bytes().await, 0);

        // Writes before the first load are deferred, not errors.
        index.upsert("a", vec![1.0, 0.0], "a").await.unwrap();
        index.remove("a").await;
        assert!(!index.is_initialized().await);
    }

    #[tokio::test]
    async fn memory_footprint_tracks_live_entries() {
        let index = seeded_index().await;
        assert_eq!(index.memory_footprint_bytes().await, 3 * 2 * 4);
        index.remove("a").await;
        assert_eq!(index.memory_footprint_bytes().await, 2 * 2 * 4);
    }

    #[tokio::test]
    async fn concurrent_first_use_initializations_coalesce() {
        let inner = MemoryDocumentStore::new();
        inner.insert_all([embedded("a", "first", vec![1.0, 0.0])]).await;
        let store = Arc::new(FlakyStore::new(inner));
        let index = Arc::new(VectorIndex::new(store.clone(), 2));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                tokio::spawn(async move { index.ensure_initialized().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Exactly one load ran; the other callers awaited it.
        assert_eq!(store.loads(), 1);
        assert!(index.is_initialized().await);
        assert_eq!(index.len().await, 1);
    }
}
