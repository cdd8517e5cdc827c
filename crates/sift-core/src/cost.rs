//! Token-to-dollar accounting.
//!
//! Prices are expressed in USD per million tokens, one table per model.
//! Tables are built once at startup and shared read-only.

use serde::{Deserialize, Serialize};

use crate::message::Usage;

/// USD per million tokens, by usage category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub input: f64,
    pub output: f64,
    #[serde(default)]
    pub cache_read: f64,
    #[serde(default)]
    pub cache_write: f64,
}

impl PriceTable {
    pub const fn new(input: f64, output: f64, cache_read: f64, cache_write: f64) -> Self {
        Self {
            input,
            output,
            cache_read,
            cache_write,
        }
    }
}

/// Per-category dollar cost of one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCost {
    pub cost_input: f64,
    pub cost_output: f64,
    pub cost_cache_read: f64,
    pub cost_cache_write: f64,
    pub cost_total: f64,
}

impl UsageCost {
    /// Convert token counts into dollar costs. Pure and total: zero tokens
    /// cost zero, and the total always equals the sum of the categories.
    pub fn compute(usage: &Usage, prices: &PriceTable) -> Self {
        let per_million = |tokens: u32, price: f64| tokens as f64 / 1_000_000.0 * price;

        let cost_input = per_million(usage.input_tokens, prices.input);
        let cost_output = per_million(usage.output_tokens, prices.output);
        let cost_cache_read = per_million(usage.cache_read_tokens, prices.cache_read);
        let cost_cache_write = per_million(usage.cache_write_tokens, prices.cache_write);

        Self {
            cost_input,
            cost_output,
            cost_cache_read,
            cost_cache_write,
            cost_total: cost_input + cost_output + cost_cache_read + cost_cache_write,
        }
    }
}
