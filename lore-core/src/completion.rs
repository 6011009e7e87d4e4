//! Completion model collaborator trait.

use async_trait::async_trait;

use crate::error::Result;

/// A single-shot text completion capability.
///
/// Generation parameters (temperature, output length) are chosen by the
/// implementation; callers supply only the system instruction and the user
/// prompt.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for `user_prompt` under `system_instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Completion`](crate::error::LoreError::Completion)
    /// on provider failure, including timeouts.
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String>;

    /// A human-readable name for the underlying model.
    fn name(&self) -> &str;
}
