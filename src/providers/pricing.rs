//! Per-model token prices for cost estimation.
//!
//! Prices are USD per million tokens, matched by the longest model-name
//! prefix so dated snapshots (`gpt-4o-mini-2024-07-18`) resolve to their
//! family. Unknown models cost 0.0.

/// (model prefix, input USD/1M, output USD/1M)
type PriceRow = (&'static str, f64, f64);

const OPENAI: &[PriceRow] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1", 2.00, 8.00),
];

const ANTHROPIC: &[PriceRow] = &[
    ("claude-3-5-haiku", 0.80, 4.00),
    ("claude-3-5-sonnet", 3.00, 15.00),
    ("claude-sonnet-4", 3.00, 15.00),
    ("claude-3-opus", 15.00, 75.00),
];

/// Estimated cost of one call in USD.
pub fn estimate_cost(provider: &str, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let table = match provider {
        "openai" => OPENAI,
        "anthropic" => ANTHROPIC,
        _ => return 0.0,
    };
    table
        .iter()
        .filter(|(prefix, _, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _, _)| prefix.len())
        .map(|(_, input, output)| {
            (f64::from(prompt_tokens) * input + f64::from(completion_tokens) * output) / 1_000_000.0
        })
        .unwrap_or(0.0)
}
