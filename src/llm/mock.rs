use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{LlmProvider, LlmResponse, Message};
use crate::config::ModelConfig;

/// Provider that returns a fixed reply and records every prompt it receives.
pub(crate) struct RecordingProvider {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingProvider {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of chat calls made so far
    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The last user prompt sent
    pub(crate) fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(_, prompt)| prompt.clone())
            .unwrap_or_default()
    }

    /// The last system prompt sent
    pub(crate) fn last_system(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(system, _)| system.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for RecordingProvider {
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<LlmResponse> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt));

        match &self.reply {
            Ok(text) => Ok(LlmResponse {
                message: Message::assistant(text.clone()),
                model: model.name.clone(),
            }),
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}
