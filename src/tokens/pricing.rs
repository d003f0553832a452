use serde::Serialize;

/// USD price per one million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

const PRICING: &[(&str, ModelPricing)] = &[
    ("gpt-4o", ModelPricing { input: 2.50, output: 10.00 }),
    ("gpt-4o-mini", ModelPricing { input: 0.15, output: 0.60 }),
    ("gpt-4-turbo", ModelPricing { input: 10.00, output: 30.00 }),
    ("gpt-4", ModelPricing { input: 30.00, output: 60.00 }),
    ("gpt-3.5-turbo", ModelPricing { input: 0.50, output: 1.50 }),
    ("claude-3-5-sonnet", ModelPricing { input: 3.00, output: 15.00 }),
    ("claude-3-5-haiku", ModelPricing { input: 0.80, output: 4.00 }),
    ("claude-3-opus", ModelPricing { input: 15.00, output: 75.00 }),
    ("claude-3-sonnet", ModelPricing { input: 3.00, output: 15.00 }),
    ("claude-3-haiku", ModelPricing { input: 0.25, output: 1.25 }),
    ("claude-sonnet-4", ModelPricing { input: 3.00, output: 15.00 }),
    ("claude-opus-4", ModelPricing { input: 15.00, output: 75.00 }),
];

const ENCODINGS: &[(&str, &str)] = &[
    ("gpt-4o", "o200k_base"),
    ("gpt-4o-mini", "o200k_base"),
    ("gpt-4-turbo", "cl100k_base"),
    ("gpt-4", "cl100k_base"),
    ("gpt-3.5-turbo", "cl100k_base"),
];

const DEFAULT_ENCODING: &str = "cl100k_base";

/// Price lookup: exact name first, then the longest table key contained in the name.
pub(crate) fn pricing_for(model: &str) -> Option<ModelPricing> {
    if let Some((_, pricing)) = PRICING.iter().find(|(name, _)| *name == model) {
        return Some(*pricing);
    }

    PRICING
        .iter()
        .filter(|(name, _)| model.contains(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, pricing)| *pricing)
}

/// Encoding lookup with the same fallback as pricing, then cl100k.
pub(crate) fn encoding_for(model: &str) -> &'static str {
    if let Some((_, encoding)) = ENCODINGS.iter().find(|(name, _)| *name == model) {
        return *encoding;
    }

    ENCODINGS
        .iter()
        .filter(|(name, _)| model.contains(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, encoding)| *encoding)
        .unwrap_or(DEFAULT_ENCODING)
}

/// Estimated spend for one call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CostEstimate {
    pub(crate) fn compute(model: &str, input_tokens: usize, output_tokens: usize) -> Self {
        let Some(pricing) = pricing_for(model) else {
            return Self {
                model: model.to_string(),
                input_tokens,
                output_tokens,
                input_cost: 0.0,
                output_cost: 0.0,
                total_cost: 0.0,
                currency: "USD",
                warning: Some("pricing not available for this model".to_string()),
            };
        };

        let input_cost = input_tokens as f64 / 1_000_000.0 * pricing.input;
        let output_cost = output_tokens as f64 / 1_000_000.0 * pricing.output;

        Self {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost: round6(input_cost),
            output_cost: round6(output_cost),
            total_cost: round6(input_cost + output_cost),
            currency: "USD",
            warning: None,
        }
    }
}

/// Static information about a model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub encoding: &'static str,
    pub input_price_per_1m: Option<f64>,
    pub output_price_per_1m: Option<f64>,
}

impl ModelInfo {
    pub(crate) fn lookup(model: &str) -> Self {
        let pricing = pricing_for(model);

        Self {
            model: model.to_string(),
            encoding: encoding_for(model),
            input_price_per_1m: pricing.map(|p| p.input),
            output_price_per_1m: pricing.map(|p| p.output),
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_over_substring() {
        assert_eq!(pricing_for("gpt-4o-mini").unwrap().input, 0.15);
        assert_eq!(pricing_for("gpt-4o").unwrap().input, 2.50);
    }

    #[test]
    fn dated_model_names_fall_back_to_family() {
        assert_eq!(pricing_for("gpt-4o-mini-2024-07-18").unwrap().input, 0.15);
        assert_eq!(
            pricing_for("claude-3-5-sonnet-20241022").unwrap().output,
            15.00
        );
        assert_eq!(
            pricing_for("claude-sonnet-4-20250514").unwrap().input,
            3.00
        );
    }

    #[test]
    fn model_info_agrees_with_cost_estimate() {
        let info = ModelInfo::lookup("gpt-4o-2024-08-06");
        assert_eq!(info.encoding, "o200k_base");
        assert_eq!(info.input_price_per_1m, Some(2.50));
        assert_eq!(info.output_price_per_1m, Some(10.00));

        let estimate = CostEstimate::compute("gpt-4o-2024-08-06", 1_000_000, 0);
        assert_eq!(info.input_price_per_1m, Some(estimate.input_cost));

        let unknown = ModelInfo::lookup("llama-3.3-70b-versatile");
        assert_eq!(unknown.encoding, "cl100k_base");
        assert!(unknown.input_price_per_1m.is_none());
    }

    #[test]
    fn unknown_model_has_no_pricing() {
        assert!(pricing_for("llama-3.3-70b-versatile").is_none());
        let estimate = CostEstimate::compute("llama-3.3-70b-versatile", 100, 100);
        assert_eq!(estimate.total_cost, 0.0);
        assert!(estimate.warning.is_some());
    }

    #[test]
    fn cost_is_rounded_to_six_decimals() {
        let estimate = CostEstimate::compute("gpt-4o", 1000, 500);
        assert_eq!(estimate.input_cost, 0.0025);
        assert_eq!(estimate.output_cost, 0.005);
        assert_eq!(estimate.total_cost, 0.0075);
    }
}
