//! Token counting and cost calculation (`spec.md` §4.1).

use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Per-1M-token USD pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Price per 1M input tokens.
    pub input: f64,
    /// Price per 1M output tokens.
    pub output: f64,
}

/// Model used when a cost budget is converted to tokens without an
/// explicit model (the most expensive tracked model, for a conservative
/// estimate).
pub const DEFAULT_BUDGET_MODEL: &str = "gpt-5.2";
/// Model used when `calculate_cost` cannot match any pricing entry.
pub const DEFAULT_PRICING_MODEL: &str = "gpt-4o";
/// Tokenizer encoding used when a model has no known mapping.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

fn pricing_table() -> &'static BTreeMap<&'static str, ModelPricing> {
    static TABLE: OnceLock<BTreeMap<&'static str, ModelPricing>> = OnceLock::new();
    TABLE.get_or_init(|| {
        BTreeMap::from([
            ("gpt-5.2", ModelPricing { input: 1.75, output: 14.00 }),
            ("gpt-4o", ModelPricing { input: 2.50, output: 10.00 }),
            ("gpt-4o-mini", ModelPricing { input: 0.150, output: 0.600 }),
            ("gpt-4-turbo", ModelPricing { input: 10.00, output: 30.00 }),
            ("gpt-4", ModelPricing { input: 30.00, output: 60.00 }),
            ("gpt-3.5-turbo", ModelPricing { input: 0.50, output: 1.50 }),
        ])
    })
}

fn tokenizer_map() -> &'static BTreeMap<&'static str, &'static str> {
    static MAP: OnceLock<BTreeMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        BTreeMap::from([
            ("gpt-5.2", "o200k_base"),
            ("gpt-4o", "o200k_base"),
            ("gpt-4o-mini", "o200k_base"),
            ("gpt-4-turbo", "cl100k_base"),
            ("gpt-4", "cl100k_base"),
            ("gpt-3.5-turbo", "cl100k_base"),
        ])
    })
}

/// Picks the tiktoken encoding name for `model` by direct lookup, then by
/// substring family match, then the default encoding.
pub fn detect_tokenizer(model: Option<&str>) -> &'static str {
    let Some(model) = model else {
        return DEFAULT_ENCODING;
    };
    let model_lower = model.to_lowercase();
    let model_lower = model_lower.trim();

    if let Some(encoding) = tokenizer_map().get(model_lower) {
        return encoding;
    }
    if model_lower.contains("gpt-5") || model_lower.contains("o200k") {
        "o200k_base"
    } else if model_lower.contains("gpt-4") || model_lower.contains("gpt-3.5") {
        "cl100k_base"
    } else {
        tracing::warn!(target: "rfp.budget", model, encoding = DEFAULT_ENCODING, "tokenizer_fallback");
        DEFAULT_ENCODING
    }
}

fn encode_len(text: &str, encoding_name: &str) -> usize {
    let bpe = match encoding_name {
        "o200k_base" => tiktoken_rs::o200k_base(),
        _ => tiktoken_rs::cl100k_base(),
    };
    match bpe {
        Ok(bpe) => bpe.encode_ordinary(text).len(),
        Err(_) => text.len().div_ceil(4),
    }
}

/// Fixed per-message overhead (role/formatting tokens), applied once per
/// message when counting a list of role/content pairs.
pub const PER_MESSAGE_OVERHEAD: usize = 4;

/// One role/content message, as counted by [`count_message_tokens`].
#[derive(Debug, Clone)]
pub struct Message {
    /// Message role, e.g. `"user"`, `"assistant"`.
    pub role: String,
    /// Message content.
    pub content: String,
}

/// Counts tokens in a single text string.
pub fn count_tokens(text: &str, model: Option<&str>) -> usize {
    if text.is_empty() {
        return 0;
    }
    encode_len(text, detect_tokenizer(model))
}

/// Counts tokens across a list of role/content messages, adding
/// [`PER_MESSAGE_OVERHEAD`] per message.
pub fn count_message_tokens(messages: &[Message], model: Option<&str>) -> usize {
    let encoding = detect_tokenizer(model);
    messages
        .iter()
        .map(|m| encode_len(&m.content, encoding) + PER_MESSAGE_OVERHEAD)
        .sum()
}

/// Counts tokens across a list of plain strings.
pub fn count_string_list_tokens(strings: &[String], model: Option<&str>) -> usize {
    let encoding = detect_tokenizer(model);
    strings.iter().map(|s| encode_len(s, encoding)).sum()
}

/// Looks up pricing for `model`: exact match, then substring match either
/// direction, then [`DEFAULT_PRICING_MODEL`] with a logged warning.
pub fn pricing_for(model: Option<&str>) -> ModelPricing {
    let model = model.unwrap_or(DEFAULT_PRICING_MODEL);
    let model_lower = model.to_lowercase();
    let model_lower = model_lower.trim();

    if let Some(p) = pricing_table().get(model_lower) {
        return *p;
    }
    for (key, pricing) in pricing_table() {
        if model_lower.contains(key) || key.contains(model_lower) {
            return *pricing;
        }
    }
    tracing::warn!(target: "rfp.budget", model, using = DEFAULT_PRICING_MODEL, "pricing_fallback");
    pricing_table()[DEFAULT_PRICING_MODEL]
}

/// Cost in USD for `input_tokens` + `output_tokens` under `model`'s pricing.
pub fn calculate_cost(input_tokens: u64, output_tokens: u64, model: Option<&str>) -> f64 {
    let pricing = pricing_for(model);
    let input_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * pricing.output;
    input_cost + output_cost
}

/// Converts a cost budget to a token budget using `model`'s output
/// pricing (the more expensive side, for a conservative estimate).
pub fn tokens_to_time_budget(cost_budget_usd: f64, model: Option<&str>) -> u64 {
    let model = model.unwrap_or(DEFAULT_BUDGET_MODEL);
    let pricing = pricing_for(Some(model));
    ((cost_budget_usd / pricing.output) * 1_000_000.0) as u64
}

/// Cost anchor: 4 hours of agent time costs $10 of output-priced tokens.
pub const COST_ANCHOR_HOURS: f64 = 4.0;
/// See [`COST_ANCHOR_HOURS`].
pub const COST_ANCHOR_USD: f64 = 10.0;

/// Converts a minutes budget to a token budget via the cost anchor:
/// `(minutes/60)/COST_ANCHOR_HOURS * COST_ANCHOR_USD`, then to tokens via
/// [`tokens_to_time_budget`].
pub fn estimate_time_to_tokens(minutes: f64, model: Option<&str>) -> u64 {
    let hours = minutes / 60.0;
    let cost_budget = (hours / COST_ANCHOR_HOURS) * COST_ANCHOR_USD;
    tokens_to_time_budget(cost_budget, model)
}
