//! Keyword-driven dispatch of free-form requests to copilots.

mod dispatch;
mod intent;

pub use dispatch::{CoordinatorRequest, CoordinatorResponse, CopilotCoordinator, CopilotResult};
pub use intent::{TaskIntent, detect_intent};
