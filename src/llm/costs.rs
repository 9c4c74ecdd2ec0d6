//! Per-token pricing tables for cost accounting.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) cost per token in USD for a model id.
///
/// Unknown models get zero rates — cost logging stays useful without
/// blocking on a pricing update.
pub fn cost_per_token(model: &str) -> (Decimal, Decimal) {
    if model.starts_with("claude-opus") {
        (dec!(0.000015), dec!(0.000075))
    } else if model.starts_with("claude-sonnet") || model.starts_with("claude-3-5-sonnet") {
        (dec!(0.000003), dec!(0.000015))
    } else if model.starts_with("claude-haiku") || model.starts_with("claude-3-5-haiku") {
        (dec!(0.0000008), dec!(0.000004))
    } else if model.starts_with("gpt-4o-mini") {
        (dec!(0.00000015), dec!(0.0000006))
    } else if model.starts_with("gpt-4o") {
        (dec!(0.0000025), dec!(0.00001))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    }
}

/// Total cost of one request given token counts and per-token rates.
pub fn request_cost(input_tokens: u32, output_tokens: u32, rates: (Decimal, Decimal)) -> Decimal {
    Decimal::from(input_tokens) * rates.0 + Decimal::from(output_tokens) * rates.1
}
