mod counter;
mod pricing;

pub use counter::TokenCounter;
pub use pricing::{CostEstimate, ModelInfo, ModelPricing};
