//! Data types for documents and search matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source document with its text content and embedding state.
///
/// Records are created by the ingestion side without an embedding; the
/// embedding pipeline fills in `embedding`, `embedding_version`, and
/// `embedded_at` when the vector is computed. Retrieval never mutates a
/// record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Unique identifier for the document.
    pub id: String,
    /// Display title.
    pub title: String,
    /// The text content embeddings are computed from.
    pub body: String,
    /// The collection this document came from (wiki, tickets, source, ...).
    pub collection: String,
    /// The embedding vector, absent until computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Tag identifying which provider/model produced the vector. A record
    /// carrying a different tag than the configured one is stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_version: Option<String>,
    /// When the embedding was last (re)generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    /// Create a record with no embedding.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            collection: collection.into(),
            embedding: None,
            embedding_version: None,
            embedded_at: None,
        }
    }
}

/// A similarity match produced by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    /// The id of the matched document.
    pub document_id: String,
    /// Cosine similarity against the query embedding (higher is more relevant).
    pub score: f32,
    /// Display title of the matched document.
    pub title: String,
}
