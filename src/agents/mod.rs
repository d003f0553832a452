mod agent;
mod response;

pub use agent::CopilotAgent;
pub use response::AgentResponse;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::copilots::CopilotKind;

/// Input handed to a copilot by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Free-text request
    pub message: String,
    /// Files to read and include
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Inline code snippet
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl TaskContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// Declared language, or `default` when none was given
    pub fn language_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.language.as_deref().unwrap_or(default)
    }
}

/// A specialized copilot that the coordinator can dispatch to
#[async_trait]
pub trait Copilot: Send + Sync {
    /// Registration key for this copilot
    fn kind(&self) -> CopilotKind;

    /// Underlying LLM agent
    fn agent(&self) -> &CopilotAgent;

    /// Handle a coordinator request
    async fn process(&self, context: &TaskContext) -> AgentResponse;
}
