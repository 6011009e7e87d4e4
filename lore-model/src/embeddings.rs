//! OpenAI-compatible embedding client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use lore_core::embedding::EmbeddingProvider;
use lore_core::error::{LoreError, Result};

/// The default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Calls `{base_url}/embeddings` directly with `reqwest`. Works against
/// api.openai.com as well as compatible endpoints (vLLM, Ollama, proxies)
/// via [`with_base_url`](Self::with_base_url).
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
/// - `timeout` – per-request bound, defaults to 30 seconds.
///
/// # Example
///
/// ```rust,ignore
/// use lore_model::OpenAIEmbeddingClient;
///
/// let client = OpenAIEmbeddingClient::new("sk-...")?;
/// let embedding = client.embed("hello world").await?;
/// assert_eq!(embedding.len(), client.dimensions());
/// ```
#[derive(Debug)]
pub struct OpenAIEmbeddingClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
    timeout: Duration,
}

impl OpenAIEmbeddingClient {
    /// Create a new client with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LoreError::Embedding {
                provider: "openai".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a new client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| LoreError::Embedding {
            provider: "openai".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size. This
    /// also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "openai", text_len = text.len(), model = %self.model, "embedding text");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.request_dimensions,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "openai", error = %e, "embedding request failed");
                LoreError::Embedding {
                    provider: "openai".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "openai", %status, "embeddings API error");
            return Err(LoreError::Embedding {
                provider: "openai".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "openai", error = %e, "failed to parse embeddings response");
            LoreError::Embedding {
                provider: "openai".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed.data.into_iter().next().map(|d| d.embedding).ok_or_else(|| {
            LoreError::Embedding {
                provider: "openai".into(),
                message: "API returned no embedding data".into(),
            }
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = OpenAIEmbeddingClient::new("").unwrap_err();
        assert!(matches!(err, LoreError::Embedding { .. }));
    }

    #[test]
    fn dimensions_follow_matryoshka_override() {
        let client = OpenAIEmbeddingClient::new("test-key").unwrap();
        assert_eq!(client.dimensions(), 1536);

        let client = client.with_dimensions(256);
        assert_eq!(client.dimensions(), 256);
        assert_eq!(client.request_dimensions, Some(256));
    }

    #[test]
    fn request_body_omits_dimensions_when_unset() {
        let body = EmbeddingRequest { model: "m", input: "hello", dimensions: None };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("dimensions").is_none());
    }
}
