//! Mock providers for tests and offline development.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use lore_core::completion::CompletionModel;
use lore_core::embedding::EmbeddingProvider;
use lore_core::error::{LoreError, Result};

/// A deterministic [`EmbeddingProvider`] for tests.
///
/// Known texts return their canned vectors; anything else gets a vector
/// derived from the text bytes, so repeated calls agree. Individual texts or
/// the whole provider can be switched into a failing mode to exercise error
/// paths.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    dimensions: usize,
    canned: HashMap<String, Vec<f32>>,
    failures: HashSet<String>,
    fail_all: bool,
}

impl MockEmbedder {
    /// Create a mock producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, ..Self::default() }
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn with_response(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.canned.insert(text.into(), vector);
        self
    }

    /// Fail whenever exactly `text` is embedded.
    pub fn with_failure(mut self, text: impl Into<String>) -> Self {
        self.failures.insert(text.into());
        self
    }

    /// Fail on every call.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_all || self.failures.contains(text) {
            return Err(LoreError::Embedding {
                provider: "mock".into(),
                message: "mock embedder configured to fail".into(),
            });
        }
        if let Some(vector) = self.canned.get(text) {
            return Ok(vector.clone());
        }

        // Deterministic fallback derived from the text bytes.
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimensions] += f32::from(byte) / 255.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A canned [`CompletionModel`] that records every prompt it receives.
#[derive(Debug)]
pub struct MockCompletion {
    reply: String,
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockCompletion {
    /// Create a mock that answers every call with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), fail: false, calls: Mutex::new(Vec::new()) }
    }

    /// Create a mock that fails every call.
    pub fn failing() -> Self {
        Self { reply: String::new(), fail: true, calls: Mutex::new(Vec::new()) }
    }

    /// The `(system_instruction, user_prompt)` pairs seen so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CompletionModel for MockCompletion {
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        self.calls.lock().await.push((system_instruction.to_string(), user_prompt.to_string()));
        if self.fail {
            return Err(LoreError::Completion {
                provider: "mock".into(),
                message: "mock completion configured to fail".into(),
            });
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "mock-completion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fallback_vectors_are_deterministic() {
        let embedder = MockEmbedder::new(4);
        let a = embedder.embed("some text").await.unwrap();
        let b = embedder.embed("some text").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[tokio::test]
    async fn canned_responses_take_precedence() {
        let embedder = MockEmbedder::new(2).with_response("hello", vec![1.0, 0.0]);
        assert_eq!(embedder.embed("hello").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn per_text_failures_only_hit_that_text() {
        let embedder = MockEmbedder::new(2).with_failure("bad");
        assert!(embedder.embed("bad").await.is_err());
        assert!(embedder.embed("good").await.is_ok());
    }

    #[tokio::test]
    async fn completion_records_prompts() {
        let model = MockCompletion::with_reply("answer");
        let reply = model.complete("system", "question").await.unwrap();
        assert_eq!(reply, "answer");

        let calls = model.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "system");
        assert_eq!(calls[0].1, "question");
    }
}
