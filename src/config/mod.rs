mod model;
mod project;

pub use model::ModelConfig;
pub use project::{CacheSettings, FileSettings, ModelSettings, ProjectConfig, ServerSettings};
