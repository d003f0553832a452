use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use super::AgentResponse;
use crate::cache::DiskCache;
use crate::config::ModelConfig;
use crate::llm::{LlmProvider, Message};
use crate::tokens::TokenCounter;

/// Number of prompt characters included in debug logs
const PROMPT_PREVIEW_CHARS: usize = 100;

/// An LLM-backed agent with fixed instructions.
///
/// `run` is the only path to the provider. It never returns an error: provider
/// failures come back as a failed [`AgentResponse`].
pub struct CopilotAgent {
    name: String,
    description: String,
    instructions: String,
    model: ModelConfig,
    provider: Arc<dyn LlmProvider>,
    cache: Option<Arc<DiskCache>>,
    counter: TokenCounter,
}

impl CopilotAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        model: ModelConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let counter = TokenCounter::new(model.name.clone());
        let agent = Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            model,
            provider,
            cache: None,
            counter,
        };
        info!(
            agent = %agent.name,
            provider = %agent.model.provider,
            model = %agent.model.name,
            "copilot initialized"
        );
        agent
    }

    /// Attach a response cache
    pub fn with_cache(mut self, cache: Arc<DiskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    fn cache_key(&self, prompt: &str) -> String {
        format!("agent:{}:{}:{}", self.name, self.model.name, prompt)
    }

    /// Send `prompt` to the provider under this agent's instructions.
    pub async fn run(&self, prompt: &str) -> AgentResponse {
        debug!(
            agent = %self.name,
            prompt = %prompt.chars().take(PROMPT_PREVIEW_CHARS).collect::<String>(),
            "running agent"
        );

        let key = self.cache_key(prompt);
        if let Some(cache) = &self.cache {
            if let Some(mut cached) = cache.get::<AgentResponse>(&key) {
                debug!(agent = %self.name, "cache hit");
                cached.metadata.insert("cached".to_string(), Value::Bool(true));
                return cached;
            }
        }

        let messages = [Message::user(prompt)];
        match self
            .provider
            .chat(&self.instructions, &messages, &self.model)
            .await
        {
            Ok(reply) => {
                let content = reply.message.content;
                let input_tokens =
                    self.counter.count(&self.instructions) + self.counter.count_messages(&messages);
                let output_tokens = self.counter.count(&content);
                let cost =
                    self.counter
                        .estimate_cost(input_tokens, output_tokens, Some(&reply.model));

                let response = AgentResponse::ok(content)
                    .with_model(reply.model.clone())
                    .with_tokens((input_tokens + output_tokens) as u64)
                    .with_metadata("agent", self.name.clone())
                    .with_metadata("model", reply.model)
                    .with_metadata("input_tokens", input_tokens as u64)
                    .with_metadata("output_tokens", output_tokens as u64)
                    .with_metadata("estimated_cost_usd", cost.total_cost);

                if let Some(cache) = &self.cache {
                    cache.set(&key, &response, None);
                }
                response
            }
            Err(e) => {
                error!(agent = %self.name, error = %e, "agent run failed");
                AgentResponse::failure(format!("Error while processing: {}", e))
                    .with_metadata("error", e.to_string())
                    .with_metadata("agent", self.name.clone())
            }
        }
    }
}

impl std::fmt::Debug for CopilotAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopilotAgent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("provider", &self.provider.name())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
