pub mod agents;
pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod copilots;
pub mod error;
pub mod llm;
pub mod tokens;
pub mod tools;

pub use agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
pub use api::{AppState, build_router};
pub use cache::DiskCache;
pub use config::{ModelConfig, ProjectConfig};
pub use coordinator::{CoordinatorRequest, CoordinatorResponse, CopilotCoordinator, TaskIntent};
pub use copilots::{CopilotFactory, CopilotKind, CopilotSuite};
pub use error::CopilotError;
pub use llm::{LlmProvider, LlmResponse, Message, MessageRole, create_provider};
pub use tokens::TokenCounter;
pub use tools::{CodeAnalyzer, FileReader, GitTool, SearchTool};
