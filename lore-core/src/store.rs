//! Document store collaborator trait.

use async_trait::async_trait;

use crate::document::DocumentRecord;
use crate::error::Result;

/// The durable system of record for documents and their embeddings.
///
/// The index treats the store as the source of truth and itself as a cache:
/// it can be rebuilt wholesale from [`load_all_with_embeddings`](DocumentStore::load_all_with_embeddings)
/// at any time. Reachability failures surface as
/// [`LoreError::StoreUnavailable`](crate::error::LoreError::StoreUnavailable).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load every document that has an embedding.
    async fn load_all_with_embeddings(&self) -> Result<Vec<DocumentRecord>>;

    /// Load a single document by id.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::DocumentNotFound`](crate::error::LoreError::DocumentNotFound)
    /// if the id is unknown.
    async fn load_by_id(&self, id: &str) -> Result<DocumentRecord>;

    /// Persist a document, overwriting any previous version.
    async fn save(&self, record: &DocumentRecord) -> Result<()>;

    /// Ids of documents whose embedding is missing or was produced by a
    /// different model version than `current_version`.
    async fn find_missing_or_stale(&self, current_version: &str) -> Result<Vec<String>>;
}
