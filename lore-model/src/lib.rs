//! # lore-model
//!
//! Provider adapters for the `lore` semantic retrieval engine.
//!
//! ## Overview
//!
//! This crate implements the collaborator traits from `lore-core` against
//! OpenAI-compatible HTTP APIs:
//!
//! - [`OpenAIEmbeddingClient`] — `/v1/embeddings`, implements
//!   [`EmbeddingProvider`](lore_core::EmbeddingProvider)
//! - [`OpenAICompletionClient`] — `/v1/chat/completions`, implements
//!   [`CompletionModel`](lore_core::CompletionModel)
//! - [`MockEmbedder`] / [`MockCompletion`] — deterministic test doubles
//!
//! Both HTTP clients accept a custom base URL, so any OpenAI-compatible
//! endpoint (vLLM, Ollama, proxies) works unchanged.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use lore_model::{OpenAICompletionClient, OpenAIEmbeddingClient};
//!
//! let embedder = OpenAIEmbeddingClient::from_env()?;
//! let completion = OpenAICompletionClient::from_env()?.with_model("gpt-4o-mini");
//!
//! let vector = embedder.embed("how do I rotate the signing key?").await?;
//! ```

pub mod chat;
pub mod embeddings;
pub mod mock;

pub use chat::OpenAICompletionClient;
pub use embeddings::OpenAIEmbeddingClient;
pub use mock::{MockCompletion, MockEmbedder};
