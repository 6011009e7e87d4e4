//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use lore_core::completion::CompletionModel;
use lore_core::error::{LoreError, Result};

/// The default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default chat model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The default sampling temperature. Kept low: answer synthesis should be
/// deterministic and grounded in the supplied context.
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// The default output token bound.
const DEFAULT_MAX_TOKENS: u32 = 512;

/// The default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`CompletionModel`] backed by an OpenAI-compatible chat-completions API.
///
/// Issues a single non-streaming request to `{base_url}/chat/completions`
/// with one system and one user message.
///
/// # Example
///
/// ```rust,ignore
/// use lore_model::OpenAICompletionClient;
///
/// let client = OpenAICompletionClient::new("sk-...")?;
/// let answer = client.complete("You are terse.", "What is Rust?").await?;
/// ```
#[derive(Debug)]
pub struct OpenAICompletionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAICompletionClient {
    /// Create a new client with the given API key.
    ///
    /// Uses the default model (`gpt-4o-mini`), a low temperature, and a
    /// bounded output length.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LoreError::Completion {
                provider: "openai".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a new client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| LoreError::Completion {
            provider: "openai".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `gpt-4o`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── CompletionModel implementation ─────────────────────────────────

#[async_trait]
impl CompletionModel for OpenAICompletionClient {
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        debug!(
            provider = "openai",
            model = %self.model,
            prompt_len = user_prompt.len(),
            "requesting completion"
        );

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_instruction },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "openai", error = %e, "completion request failed");
                LoreError::Completion {
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

            error!(provider = "openai", %status, "chat completions API error");
            return Err(LoreError::Completion {
                provider: "openai".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "openai", error = %e, "failed to parse completion response");
            LoreError::Completion {
                provider: "openai".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed.choices.into_iter().next().and_then(|c| c.message.content).ok_or_else(|| {
            LoreError::Completion {
                provider: "openai".into(),
                message: "API returned no completion choices".into(),
            }
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = OpenAICompletionClient::new("").unwrap_err();
        assert!(matches!(err, LoreError::Completion { .. }));
    }

    #[test]
    fn name_reports_the_configured_model() {
        let client = OpenAICompletionClient::new("test-key").unwrap().with_model("gpt-4o");
        assert_eq!(client.name(), "gpt-4o");
    }

    #[test]
    fn response_content_deserializes() {
        let raw = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hello"));
    }
}
