// pricing/inflation.rs
// Inflation adjustment of the placing price.

use super::rounding::round2;

/// Inputs resolved from the previous service-month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InflationInputs {
    /// Placing price billed to the company in the previous month.
    pub previous_placing_price: f64,
    /// Consumer-price index of the previous month, in percent (100 = no change).
    pub previous_index: Option<f64>,
}

/// Raw adjustment for one month; negative when prices fell.
pub fn inflation_amount(previous_placing_price: f64, previous_index: f64) -> f64 {
    round2(previous_placing_price * (previous_index - 100.0) / 100.0)
}

/// Adjustment actually billed: never below zero.
pub fn applied_inflation(inputs: &InflationInputs) -> Option<f64> {
    let index = inputs.previous_index?;
    Some(inflation_amount(inputs.previous_placing_price, index).max(0.0))
}

/// Placing price after inflation: `previous + max(adjustment, 0)`.
pub fn inflated_placing_price(previous_placing_price: f64, adjustment: f64) -> f64 {
    round2(previous_placing_price + adjustment.max(0.0))
}
