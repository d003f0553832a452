mod backends;
mod message;
#[cfg(test)]
pub(crate) mod mock;
mod provider;

use std::sync::Arc;

pub use backends::{AnthropicProvider, GroqProvider, OpenAIProvider};
pub use message::{Message, MessageRole};
pub use provider::{LlmProvider, LlmResponse};

use crate::error::CopilotError;

/// Provider names accepted by [`create_provider`]
pub const PROVIDERS: &[&str] = &["openai", "anthropic", "groq"];

/// Create a provider by backend name
pub fn create_provider(name: &str) -> Result<Arc<dyn LlmProvider>, CopilotError> {
    let provider: Arc<dyn LlmProvider> = match name {
        "openai" => Arc::new(OpenAIProvider::from_env()?),
        "anthropic" => Arc::new(AnthropicProvider::from_env()?),
        "groq" => Arc::new(GroqProvider::from_env()?),
        other => {
            return Err(CopilotError::Provider(format!(
                "unknown provider: {} (expected one of: {})",
                other,
                PROVIDERS.join(", ")
            )));
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider("nope").err().unwrap();
        assert_eq!(err.code(), "provider");
        assert!(err.to_string().contains("unknown provider: nope"));
    }
}
