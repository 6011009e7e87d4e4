//! Retrieval-and-synthesis engine.
//!
//! Turns a free-text query into a ranked result set and, when a completion
//! model is attached, a cited answer synthesized from the top matches.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lore_core::completion::CompletionModel;
use lore_core::document::DocumentRecord;
use lore_core::embedding::EmbeddingProvider;
use lore_core::error::{LoreError, Result};
use lore_core::store::DocumentStore;

use crate::config::RetrievalConfig;
use crate::index::VectorIndex;
use crate::text::truncate_chars;

/// Fixed instruction for answer synthesis: the model may only use the
/// supplied context, must cite source titles, and must say so when the
/// context holds no answer.
const ANSWER_SYSTEM_INSTRUCTION: &str = "You answer questions about an internal document base. \
     Use only the provided context documents. Cite the titles of the documents that support \
     your answer. If the context does not contain the answer, say so explicitly instead of \
     guessing.";

/// A fully hydrated search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// The matched document, straight from the store.
    pub document: DocumentRecord,
    /// Cosine similarity against the query embedding.
    pub score: f32,
    /// Synthesized answer; set on the single top match only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Result of one retrieval call.
///
/// An empty `matches` is a valid outcome, not an error. When matches were
/// found but the answer could not be synthesized, `synthesis_error` says why
/// and `matches` is still complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked matches, best first.
    pub matches: Vec<ScoredDocument>,
    /// Why synthesis produced no answer, when it was attempted and failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
}

/// The retrieval-and-synthesis engine.
///
/// Read-only consumer of documents: it embeds queries, ranks them against
/// the [`VectorIndex`], hydrates matches from the [`DocumentStore`], and
/// optionally asks a [`CompletionModel`] for a cited answer. Construct one
/// via [`RetrievalEngine::builder()`].
pub struct RetrievalEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    completion: Option<Arc<dyn CompletionModel>>,
    config: RetrievalConfig,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("completion", &self.completion.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Create a new [`RetrievalEngineBuilder`].
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::default()
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Embed `query`, rank it against the index, hydrate the matches from
    /// the store, and optionally synthesize an answer.
    ///
    /// The index is initialized on first use; concurrent first queries share
    /// a single load. The index is asked for `2 × limit` candidates so
    /// synthesis has context to choose from and hydration can drop ids that
    /// vanished from the store since indexing.
    ///
    /// # Errors
    ///
    /// A failed query embedding fails the call ([`LoreError::Embedding`]) —
    /// there is no result without it. Store unreachability fails the call
    /// ([`LoreError::StoreUnavailable`]). A failed synthesis does not: the
    /// matches come back with [`SearchResponse::synthesis_error`] set.
    pub async fn search(&self, query: &str, limit: usize, min_score: f32) -> Result<SearchResponse> {
        let query_embedding = self.embedder.embed(query).await?;

        self.index.ensure_initialized().await?;

        let candidates =
            self.index.search(&query_embedding, limit.saturating_mul(2), min_score).await?;
        debug!(query_len = query.len(), candidates = candidates.len(), "index scan complete");

        let mut matches = Vec::with_capacity(candidates.len().min(limit));
        for candidate in &candidates {
            match self.store.load_by_id(&candidate.document_id).await {
                Ok(document) => {
                    matches.push(ScoredDocument { document, score: candidate.score, answer: None });
                }
                Err(LoreError::DocumentNotFound(id)) => {
                    // The index is a cache; it can briefly outrun the store.
                    warn!(document.id = %id, "indexed document missing from store, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        // Stable sort keeps the index's deterministic tie-break.
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);

        let mut synthesis_error = None;
        if let Some(completion) = &self.completion {
            if matches.is_empty() {
                debug!("no matches above threshold, skipping synthesis");
            } else {
                match self.synthesize(query, &matches, completion.as_ref()).await {
                    Ok(answer) => matches[0].answer = Some(answer),
                    Err(e) => {
                        warn!(error = %e, "answer synthesis failed, returning matches without an answer");
                        synthesis_error = Some(e.to_string());
                    }
                }
            }
        }

        info!(
            matches = matches.len(),
            answered = matches.first().is_some_and(|m| m.answer.is_some()),
            "search complete"
        );
        Ok(SearchResponse { matches, synthesis_error })
    }

    /// Compose the bounded context block and ask the completion model.
    ///
    /// At most `context_documents` matches contribute, each truncated to
    /// `context_chars_per_document`, which caps the model input regardless
    /// of the caller's `limit`.
    async fn synthesize(
        &self,
        query: &str,
        matches: &[ScoredDocument],
        completion: &dyn CompletionModel,
    ) -> Result<String> {
        let context = matches
            .iter()
            .take(self.config.context_documents)
            .map(|m| {
                format!(
                    "Title: {}\nCollection: {}\nContent: {}",
                    m.document.title,
                    m.document.collection,
                    truncate_chars(&m.document.body, self.config.context_chars_per_document),
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        let prompt = format!("Context documents:\n{context}\n\nQuestion: {query}");
        debug!(model = completion.name(), prompt_len = prompt.len(), "synthesizing answer");
        completion.complete(ANSWER_SYSTEM_INSTRUCTION, &prompt).await
    }
}

/// Builder for constructing a [`RetrievalEngine`].
///
/// Store, embedder, index, and config are required; the completion model is
/// optional — without one, searches return ranked matches and skip
/// synthesis.
///
/// # Example
///
/// ```rust,ignore
/// let engine = RetrievalEngine::builder()
///     .config(RetrievalConfig::default())
///     .store(store)
///     .embedder(embedder)
///     .index(index)
///     .completion(completion)  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RetrievalEngineBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<VectorIndex>>,
    completion: Option<Arc<dyn CompletionModel>>,
    config: Option<RetrievalConfig>,
}

impl RetrievalEngineBuilder {
    /// Set the document store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the embedding provider used for queries.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector index.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set an optional completion model for answer synthesis.
    pub fn completion(mut self, completion: Arc<dyn CompletionModel>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the [`RetrievalEngine`], validating that all required fields
    /// are set and that the embedder and index agree on dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] if a required component is missing or
    /// the dimensions disagree.
    pub fn build(self) -> Result<RetrievalEngine> {
        let store =
            self.store.ok_or_else(|| LoreError::Config("store is required".to_string()))?;
        let embedder =
            self.embedder.ok_or_else(|| LoreError::Config("embedder is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| LoreError::Config("index is required".to_string()))?;
        let config =
            self.config.ok_or_else(|| LoreError::Config("config is required".to_string()))?;

        if embedder.dimensions() != index.dimensions() {
            return Err(LoreError::Config(format!(
                "embedder produces {}-dimensional vectors but the index expects {}",
                embedder.dimensions(),
                index.dimensions()
            )));
        }

        Ok(RetrievalEngine { store, embedder, index, completion: self.completion, config })
    }
}
