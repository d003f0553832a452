use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, MessageType};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use super::{LlmProvider, LlmResponse, Message, MessageRole};
use crate::config::ModelConfig;
use crate::error::CopilotError;

const API_TIMEOUT_SECS: u64 = 120;

/// Parameters for the shared chat implementation
struct ChatParams<'a> {
    backend: LLMBackend,
    provider_name: &'a str,
    api_key: &'a str,
    system: &'a str,
    messages: &'a [Message],
    model: &'a ModelConfig,
}

fn api_key(var: &str) -> Result<String, CopilotError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CopilotError::Provider(format!("{} environment variable not set", var)))
}

fn convert_message(msg: &Message) -> ChatMessage {
    let role = match msg.role {
        MessageRole::User => ChatRole::User,
        MessageRole::Assistant => ChatRole::Assistant,
    };
    ChatMessage {
        role,
        message_type: MessageType::Text,
        content: msg.content.clone(),
    }
}

/// Shared implementation for providers backed by the `llm` crate.
async fn chat_impl(params: ChatParams<'_>) -> Result<LlmResponse> {
    let llm = LLMBuilder::new()
        .backend(params.backend)
        .api_key(params.api_key)
        .model(&params.model.name)
        .system(params.system)
        .temperature(params.model.temperature)
        .max_tokens(params.model.max_tokens)
        .build()
        .context("failed to build LLM client")?;

    let chat_messages: Vec<ChatMessage> = params.messages.iter().map(convert_message).collect();

    debug!(
        provider = params.provider_name,
        model = %params.model.name,
        messages = chat_messages.len(),
        "sending chat request"
    );

    let response = timeout(Duration::from_secs(API_TIMEOUT_SECS), llm.chat(&chat_messages))
        .await
        .with_context(|| {
            format!(
                "{} API call timed out after {} seconds",
                params.provider_name, API_TIMEOUT_SECS
            )
        })?
        .with_context(|| format!("failed to call {} API", params.provider_name))?;

    let content = response.text().unwrap_or_else(|| {
        warn!(
            provider = params.provider_name,
            "API returned empty or missing response text"
        );
        String::new()
    });

    Ok(LlmResponse {
        message: Message::assistant(content),
        model: params.model.name.clone(),
    })
}

/// Anthropic LLM provider using the llm crate
pub struct AnthropicProvider {
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the key from `ANTHROPIC_API_KEY`
    pub fn from_env() -> Result<Self, CopilotError> {
        Ok(Self::new(api_key("ANTHROPIC_API_KEY")?))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse> {
        chat_impl(ChatParams {
            backend: LLMBackend::Anthropic,
            provider_name: "Anthropic",
            api_key: &self.api_key,
            system,
            messages,
            model,
        })
        .await
    }
}

/// OpenAI LLM provider using the llm crate
pub struct OpenAIProvider {
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the key from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self, CopilotError> {
        Ok(Self::new(api_key("OPENAI_API_KEY")?))
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse> {
        chat_impl(ChatParams {
            backend: LLMBackend::OpenAI,
            provider_name: "OpenAI",
            api_key: &self.api_key,
            system,
            messages,
            model,
        })
        .await
    }
}

/// Groq LLM provider using the llm crate
pub struct GroqProvider {
    api_key: String,
}

impl GroqProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the key from `GROQ_API_KEY`
    pub fn from_env() -> Result<Self, CopilotError> {
        Ok(Self::new(api_key("GROQ_API_KEY")?))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse> {
        chat_impl(ChatParams {
            backend: LLMBackend::Groq,
            provider_name: "Groq",
            api_key: &self.api_key,
            system,
            messages,
            model,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_roles() {
        let user = convert_message(&Message::user("hi"));
        assert!(matches!(user.role, ChatRole::User));
        assert_eq!(user.content, "hi");

        let assistant = convert_message(&Message::assistant("hello"));
        assert!(matches!(assistant.role, ChatRole::Assistant));
    }

    #[test]
    fn provider_names() {
        assert_eq!(AnthropicProvider::new("k").name(), "anthropic");
        assert_eq!(OpenAIProvider::new("k").name(), "openai");
        assert_eq!(GroqProvider::new("k").name(), "groq");
    }
}
