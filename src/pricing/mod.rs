//! Invoice pricing: default price per line, line sums, inflation and rounding.
//!
//! Derivation and state writes are separate steps: `derive_price` only reads its
//! context, `apply_price` and `recompute_line` write into a `LineItem`.

mod inflation;
mod rounding;
mod rules;
mod sum;

pub use inflation::{InflationInputs, applied_inflation, inflated_placing_price, inflation_amount};
pub use rounding::{round1, round2};
pub use rules::{DerivationMode, PricingContext, apply_price, derive_price, price_editable};
pub use sum::{check_readings, compute_sum, displayed_quantity, general_sum, recompute_line};

use crate::models::{Company, LineItem, LineItemType};

/// Normalises a line list before it is persisted: discount prices are stored
/// as non-positive values and every sum is recomputed.
pub fn finalize_lines(lines: &mut [LineItem]) -> f64 {
    for line in lines.iter_mut() {
        if line.kind == LineItemType::Discount {
            line.price = line.price.map(|p| -p.abs());
        }
        recompute_line(line);
    }
    general_sum(lines)
}

/// Discounts are entered as positive numbers and stored negated.
pub fn normalize_discount(value: f64) -> f64 {
    if value > 0.0 { -value } else { value }
}

/// Runs the engine over a full line list: derive, apply, recompute.
pub fn price_lines(lines: &mut [LineItem], ctx: &PricingContext<'_>) -> f64 {
    for line in lines.iter_mut() {
        let derived = derive_price(line.kind, ctx);
        if apply_price(line, derived) {
            tracing::debug!(line = ?line.kind, price = ?line.price, "derived line price");
        }
        recompute_line(line);
    }
    general_sum(lines)
}

/// Every line type with empty inputs, in invoice order.
pub fn blank_invoice(company: Option<&Company>) -> Vec<LineItem> {
    LineItemType::ALL
        .iter()
        .filter(|kind| match kind {
            LineItemType::Inflation => company.is_some_and(|c| c.inflicion),
            LineItemType::GarbageCollector => company.is_some_and(|c| c.garbage_collector),
            LineItemType::WaterPart => company.is_some_and(|c| c.water_part.is_some()),
            LineItemType::Discount => company.is_some_and(|c| c.discount != 0.0),
            _ => true,
        })
        .map(|kind| LineItem::new(*kind))
        .collect()
}
