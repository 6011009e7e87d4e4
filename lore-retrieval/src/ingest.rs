//! Embedding ingestion pipeline.
//!
//! Closes the gap between documents lacking embeddings and a fully-embedded
//! corpus: candidates are discovered through the store, embedded in
//! rate-limited concurrent groups, persisted, and pushed into the
//! [`VectorIndex`].

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use lore_core::document::DocumentRecord;
use lore_core::embedding::EmbeddingProvider;
use lore_core::error::{LoreError, Result};
use lore_core::store::DocumentStore;

use crate::config::RetrievalConfig;
use crate::index::VectorIndex;
use crate::text::truncate_chars;

/// One document that could not be embedded during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    /// Id of the failing document.
    pub document_id: String,
    /// Title, when the document loaded far enough to know it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable description of the failure.
    pub message: String,
}

/// Outcome of a batch run.
///
/// Per-document failures are reporting data, not errors: one failing
/// document never blocks the rest of the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents embedded and saved.
    pub succeeded: usize,
    /// Documents that failed at some stage.
    pub failed: usize,
    /// Details for every failure.
    pub failures: Vec<IngestFailure>,
}

/// Embeds documents and keeps the store and the [`VectorIndex`] consistent.
pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    config: RetrievalConfig,
}

impl IngestionPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self { store, embedder, index, config }
    }

    /// Embed one document and persist the result.
    ///
    /// The store is only written after the provider call succeeds, so a
    /// failed embedding leaves the record untouched. If the index is already
    /// serving, the fresh vector is upserted so reads stay consistent
    /// without a full reload.
    ///
    /// # Errors
    ///
    /// [`LoreError::DocumentNotFound`] for an unknown id;
    /// [`LoreError::Embedding`] if the provider call fails (including
    /// timeouts); [`LoreError::DimensionMismatch`] if the provider returns a
    /// vector of the wrong length. In every case the store is unmodified.
    pub async fn process_document(&self, id: &str) -> Result<DocumentRecord> {
        let record = self.store.load_by_id(id).await?;
        self.embed_record(record).await
    }

    async fn embed_record(&self, mut record: DocumentRecord) -> Result<DocumentRecord> {
        let text = format!("{}\n\n{}", record.title, record.body);
        let text = truncate_chars(&text, self.config.max_embed_chars);

        let embedding = self.embedder.embed(text).await?;
        if embedding.len() != self.index.dimensions() {
            return Err(LoreError::DimensionMismatch {
                expected: self.index.dimensions(),
                actual: embedding.len(),
            });
        }

        record.embedding = Some(embedding.clone());
        record.embedding_version = Some(self.config.embedding_version.clone());
        record.embedded_at = Some(Utc::now());
        self.store.save(&record).await?;

        if self.index.is_initialized().await {
            self.index.upsert(record.id.clone(), embedding, record.title.clone()).await?;
        }

        debug!(document.id = %record.id, "document embedded");
        Ok(record)
    }

    /// Like [`process_document`](Self::process_document), but reports the
    /// failure instead of propagating it, carrying the title when the load
    /// got far enough to know it.
    async fn embed_reporting(&self, id: &str) -> std::result::Result<(), IngestFailure> {
        let record = match self.store.load_by_id(id).await {
            Ok(record) => record,
            Err(e) => {
                return Err(IngestFailure {
                    document_id: id.to_string(),
                    title: None,
                    message: e.to_string(),
                });
            }
        };

        let title = record.title.clone();
        match self.embed_record(record).await {
            Ok(_) => Ok(()),
            Err(e) => Err(IngestFailure {
                document_id: id.to_string(),
                title: Some(title),
                message: e.to_string(),
            }),
        }
    }

    /// Embed every document whose vector is missing or stale.
    ///
    /// Candidates are partitioned into groups of `batch_size`; within a
    /// group every document is processed concurrently, and the next group
    /// only starts once the whole group has finished and the configured
    /// cooldown has elapsed. The cooldown is a designed backpressure
    /// mechanism for provider rate limits, not an incidental wait.
    ///
    /// Per-document failures are caught and recorded in the returned
    /// [`IngestReport`]. After all groups complete, an index that was
    /// serving at batch start is refreshed once, amortizing the rebuild over
    /// the whole run.
    ///
    /// # Errors
    ///
    /// Fails only if the candidate documents cannot be enumerated.
    pub async fn process_batch(&self, batch_size: usize) -> Result<IngestReport> {
        let pending = self.store.find_missing_or_stale(&self.config.embedding_version).await?;
        if pending.is_empty() {
            info!("no documents pending embedding");
            return Ok(IngestReport::default());
        }

        let batch_size = batch_size.max(1);
        let groups = pending.len().div_ceil(batch_size);
        let index_was_initialized = self.index.is_initialized().await;
        info!(pending = pending.len(), groups, batch_size, "starting embedding batch");

        let mut report = IngestReport::default();
        for (group, ids) in pending.chunks(batch_size).enumerate() {
            let outcomes = join_all(ids.iter().map(|id| self.embed_reporting(id))).await;
            for outcome in outcomes {
                match outcome {
                    Ok(()) => report.succeeded += 1,
                    Err(failure) => {
                        warn!(
                            document.id = %failure.document_id,
                            error = %failure.message,
                            "document failed to embed"
                        );
                        report.failed += 1;
                        report.failures.push(failure);
                    }
                }
            }

            if group + 1 < groups {
                sleep(self.config.batch_cooldown).await;
            }
        }

        if index_was_initialized {
            // One rebuild instead of counting on N incremental upserts; a
            // refresh failure downgrades to the previous generation, it does
            // not invalidate the report.
            if let Err(e) = self.index.refresh().await {
                warn!(error = %e, "index refresh after batch failed, previous generation serves");
            }
        }

        info!(succeeded = report.succeeded, failed = report.failed, "embedding batch finished");
        Ok(report)
    }
}
