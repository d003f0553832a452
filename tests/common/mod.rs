#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use copilot_ia::{
    CopilotFactory, FileReader, LlmProvider, LlmResponse, Message, ModelConfig, ProjectConfig,
};

/// A mock LLM provider that replays scripted replies in order.
///
/// Once the script runs out the last reply is repeated. Every prompt is recorded.
pub struct MockLlmProvider {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    /// Create a mock that always answers with `text`.
    pub fn single_response(text: &str) -> Self {
        Self::with_responses(vec![text])
    }

    /// Create a mock from a sequence of replies (popped in order).
    pub fn with_responses(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            last: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat(
        &self,
        _system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse> {
        if let Some(message) = messages.last() {
            self.prompts.lock().unwrap().push(message.content.clone());
        }

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(LlmResponse {
            message: Message::assistant(last.clone()),
            model: model.name.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A provider whose every call fails, like an exhausted quota.
pub struct FailingLlmProvider;

#[async_trait]
impl LlmProvider for FailingLlmProvider {
    async fn chat(
        &self,
        _system: &str,
        _messages: &[Message],
        _model: &ModelConfig,
    ) -> Result<LlmResponse> {
        anyhow::bail!("service unavailable")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Factory over `provider` reading files under `root`, with default configuration.
pub fn factory(provider: Arc<dyn LlmProvider>, root: &std::path::Path) -> CopilotFactory {
    CopilotFactory::new(provider, ProjectConfig::default()).with_file_reader(FileReader::new(root))
}
