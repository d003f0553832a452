use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one copilot call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
}

impl AgentResponse {
    /// Successful response with empty metadata
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            metadata: Map::new(),
            tokens_used: None,
            model: None,
        }
    }

    /// Failed response; `content` carries the message shown to the user
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(content)
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    /// Whether this response was served from the cache
    pub fn is_cached(&self) -> bool {
        self.metadata
            .get("cached")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
