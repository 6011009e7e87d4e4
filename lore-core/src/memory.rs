//! In-memory document store for development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::DocumentRecord;
use crate::error::{LoreError, Result};
use crate::store::DocumentStore;

/// A [`DocumentStore`] backed by a `BTreeMap` protected by a
/// `tokio::sync::RwLock`.
///
/// Suitable for development, testing, and small corpora; nothing survives a
/// process restart. The `BTreeMap` gives deterministic enumeration order
/// (sorted by id).
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    records: RwLock<BTreeMap<String, DocumentRecord>>,
}

impl MemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records, replacing any existing entries with the same id.
    pub async fn insert_all(&self, records: impl IntoIterator<Item = DocumentRecord>) {
        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.id.clone(), record);
        }
    }

    /// Remove a record if present.
    pub async fn remove(&self, id: &str) {
        self.records.write().await.remove(id);
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load_all_with_embeddings(&self) -> Result<Vec<DocumentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.embedding.is_some()).cloned().collect())
    }

    async fn load_by_id(&self, id: &str) -> Result<DocumentRecord> {
        let records = self.records.read().await;
        records.get(id).cloned().ok_or_else(|| LoreError::DocumentNotFound(id.to_string()))
    }

    async fn save(&self, record: &DocumentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_missing_or_stale(&self, current_version: &str) -> Result<Vec<String>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| {
                r.embedding.is_none() || r.embedding_version.as_deref() != Some(current_version)
            })
            .map(|r| r.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn embedded(id: &str, version: &str) -> DocumentRecord {
        DocumentRecord {
            embedding: Some(vec![0.1, 0.2]),
            embedding_version: Some(version.to_string()),
            embedded_at: Some(Utc::now()),
            ..DocumentRecord::new(id, format!("title {id}"), "body", "wiki")
        }
    }

    #[tokio::test]
    async fn load_by_id_unknown_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store.load_by_id("missing").await.unwrap_err();
        assert!(matches!(err, LoreError::DocumentNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn load_all_skips_documents_without_embeddings() {
        let store = MemoryDocumentStore::new();
        store
            .insert_all([embedded("a", "v1"), DocumentRecord::new("b", "title b", "body", "wiki")])
            .await;

        let loaded = store.load_all_with_embeddings().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "a");
    }

    #[tokio::test]
    async fn missing_and_stale_documents_are_pending() {
        let store = MemoryDocumentStore::new();
        store
            .insert_all([
                embedded("current", "v2"),
                embedded("stale", "v1"),
                DocumentRecord::new("missing", "title", "body", "tickets"),
            ])
            .await;

        let mut pending = store.find_missing_or_stale("v2").await.unwrap();
        pending.sort();
        assert_eq!(pending, vec!["missing".to_string(), "stale".to_string()]);
    }

    #[tokio::test]
    async fn save_overwrites_previous_version() {
        let store = MemoryDocumentStore::new();
        store.save(&DocumentRecord::new("a", "old", "body", "wiki")).await.unwrap();
        store.save(&embedded("a", "v1")).await.unwrap();

        let loaded = store.load_by_id("a").await.unwrap();
        assert!(loaded.embedding.is_some());
        assert_eq!(store.len().await, 1);
    }
}
