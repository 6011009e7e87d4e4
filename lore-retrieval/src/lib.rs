//! # lore-retrieval
//!
//! The algorithmic core of the `lore` semantic retrieval engine:
//!
//! - [`VectorIndex`] — in-memory id → embedding mapping with exact
//!   cosine-similarity ranking
//! - [`IngestionPipeline`] — embeds documents in rate-limited concurrent
//!   groups and keeps the index consistent with the store
//! - [`RetrievalEngine`] — embeds a query, ranks the corpus, and optionally
//!   synthesizes a cited answer from the top matches
//!
//! The document store, embedding provider, and completion model are
//! collaborators behind the `lore-core` traits; `lore-model` provides
//! OpenAI-compatible implementations.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lore_retrieval::{IngestionPipeline, RetrievalConfig, RetrievalEngine, VectorIndex};
//!
//! let config = RetrievalConfig::default();
//! let index = Arc::new(VectorIndex::new(store.clone(), embedder.dimensions()));
//!
//! let pipeline = IngestionPipeline::new(store.clone(), embedder.clone(), index.clone(), config.clone());
//! let report = pipeline.process_batch(16).await?;
//! println!("embedded {} documents, {} failed", report.succeeded, report.failed);
//!
//! let engine = RetrievalEngine::builder()
//!     .config(config)
//!     .store(store)
//!     .embedder(embedder)
//!     .index(index)
//!     .completion(completion)
//!     .build()?;
//!
//! let response = engine.search("how do I rotate the signing key?", 5, 0.25).await?;
//! ```

pub mod config;
pub mod engine;
pub mod index;
pub mod ingest;
mod text;

pub use config::RetrievalConfig;
pub use engine::{RetrievalEngine, ScoredDocument, SearchResponse};
pub use index::{VectorIndex, cosine_similarity};
pub use ingest::{IngestFailure, IngestReport, IngestionPipeline};
