// Pricing table for the chat models used by the conversation engine
//
// Only input and output rates matter here: the engine estimates the cost of
// each answer from prompt and response text and raises a notice when an
// answer gets expensive. Rates are USD per million tokens.

/// Pricing information for a specific model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }
}

/// Get pricing for a chat model
///
/// Dated snapshots ("gpt-4o-2024-08-06") resolve through prefix matching, so
/// the most specific prefix must come first. Unknown models fall back to
/// gpt-4o rates, which overestimates for small models rather than staying quiet.
pub fn get_pricing(model: &str) -> ModelPricing {
    const TABLE: &[(&str, ModelPricing)] = &[
        ("gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
        ("gpt-4o", ModelPricing::new(2.50, 10.00)),
        ("gpt-4-turbo", ModelPricing::new(10.00, 30.00)),
        ("gpt-4", ModelPricing::new(30.00, 60.00)),
        ("gpt-3.5-turbo", ModelPricing::new(0.50, 1.50)),
        ("o1-mini", ModelPricing::new(3.00, 12.00)),
        ("o1", ModelPricing::new(15.00, 60.00)),
        ("o3-mini", ModelPricing::new(1.10, 4.40)),
        ("claude-3-5-haiku", ModelPricing::new(1.00, 5.00)),
        ("claude-3-5-sonnet", ModelPricing::new(3.00, 15.00)),
        ("claude-3-opus", ModelPricing::new(15.00, 75.00)),
        ("claude-3-haiku", ModelPricing::new(0.25, 1.25)),
        ("claude-3-sonnet", ModelPricing::new(3.00, 15.00)),
    ];

    TABLE
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, pricing)| pricing.clone())
        .unwrap_or(ModelPricing::new(2.50, 10.00))
}

/// Calculate cost in USD for the given token usage
pub fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let pricing = get_pricing(model);

    let input_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million;

    input_cost + output_cost
}
