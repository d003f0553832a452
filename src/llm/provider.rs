use anyhow::Result;
use async_trait::async_trait;

use super::Message;
use crate::config::ModelConfig;

/// Response from an LLM
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The assistant message
    pub message: Message,
    /// Model that produced the reply
    pub model: String,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and get a response
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse>;

    /// Get the provider name
    fn name(&self) -> &str;
}
