//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The dimension is fixed per provider and invariant for the
/// process lifetime; every vector returned by [`embed`](EmbeddingProvider::embed)
/// has exactly [`dimensions`](EmbeddingProvider::dimensions) components.
///
/// # Example
///
/// ```rust,ignore
/// use lore_core::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Embedding`](crate::error::LoreError::Embedding)
    /// on malformed input or provider unavailability. A timed-out call is
    /// reported the same way as any other provider failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}
