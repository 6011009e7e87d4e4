//! Configuration for ingestion and retrieval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use lore_core::error::{LoreError, Result};

/// Tunables shared by the ingestion pipeline and the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Tag recorded on every embedding the pipeline writes. Stored documents
    /// carrying a different tag are treated as stale and re-embedded.
    pub embedding_version: String,
    /// Hard character budget for the text sent to the embedding provider.
    pub max_embed_chars: usize,
    /// Pause between ingestion groups; provider rate limits assume it.
    pub batch_cooldown: Duration,
    /// Maximum number of matches fed into answer synthesis.
    pub context_documents: usize,
    /// Per-document character budget in the synthesis context.
    pub context_chars_per_document: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_version: "text-embedding-3-small".to_string(),
            max_embed_chars: 16_000,
            batch_cooldown: Duration::from_secs(1),
            context_documents: 3,
            context_chars_per_document: 2_000,
        }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the embedding version tag.
    pub fn embedding_version(mut self, version: impl Into<String>) -> Self {
        self.config.embedding_version = version.into();
        self
    }

    /// Set the character budget for embedding input.
    pub fn max_embed_chars(mut self, chars: usize) -> Self {
        self.config.max_embed_chars = chars;
        self
    }

    /// Set the pause between ingestion groups.
    pub fn batch_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.batch_cooldown = cooldown;
        self
    }

    /// Set how many top matches contribute to answer synthesis.
    pub fn context_documents(mut self, count: usize) -> Self {
        self.config.context_documents = count;
        self
    }

    /// Set the per-document character budget in the synthesis context.
    pub fn context_chars_per_document(mut self, chars: usize) -> Self {
        self.config.context_chars_per_document = chars;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] if:
    /// - `embedding_version` is empty
    /// - `max_embed_chars == 0`
    /// - `context_documents == 0`
    /// - `context_chars_per_document == 0`
    pub fn build(self) -> Result<RetrievalConfig> {
        if self.config.embedding_version.is_empty() {
            return Err(LoreError::Config("embedding_version must not be empty".to_string()));
        }
        if self.config.max_embed_chars == 0 {
            return Err(LoreError::Config("max_embed_chars must be greater than zero".to_string()));
        }
        if self.config.context_documents == 0 {
            return Err(LoreError::Config(
                "context_documents must be greater than zero".to_string(),
            ));
        }
        if self.config.context_chars_per_document == 0 {
            return Err(LoreError::Config(
                "context_chars_per_document must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = RetrievalConfig::builder().build().unwrap();
        assert_eq!(config, RetrievalConfig::default());
    }

    #[test]
    fn zero_context_documents_is_rejected() {
        let err = RetrievalConfig::builder().context_documents(0).build().unwrap_err();
        assert!(matches!(err, LoreError::Config(_)));
    }

    #[test]
    fn empty_embedding_version_is_rejected() {
        let err = RetrievalConfig::builder().embedding_version("").build().unwrap_err();
        assert!(matches!(err, LoreError::Config(_)));
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RetrievalConfig::builder()
            .embedding_version("v2")
            .max_embed_chars(500)
            .batch_cooldown(Duration::from_millis(250))
            .context_documents(5)
            .context_chars_per_document(800)
            .build()
            .unwrap();

        assert_eq!(config.embedding_version, "v2");
        assert_eq!(config.max_embed_chars, 500);
        assert_eq!(config.batch_cooldown, Duration::from_millis(250));
        assert_eq!(config.context_documents, 5);
        assert_eq!(config.context_chars_per_document, 800);
    }
}
