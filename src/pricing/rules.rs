// pricing/rules.rs
// Per-line price derivation. Every rule is pure: it reads the context and returns
// the price to write, or None when its source data is not ready yet.

use crate::models::{Company, LineItem, LineItemType, Service};

use super::inflation::{InflationInputs, applied_inflation, inflated_placing_price};
use super::rounding::{round1, round2};

/// Create mode derives prices; edit mode only displays what was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMode {
    #[default]
    Create,
    Edit,
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingContext<'a> {
    pub company: Option<&'a Company>,
    pub service: Option<&'a Service>,
    /// Resolved only when a previous service-month exists.
    pub inflation: Option<InflationInputs>,
    pub mode: DerivationMode,
}

/// Derivation strategy attached to each line type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceRule {
    /// Company's individual maintenance price, else the month's rent price.
    Maintenance,
    /// Company price per meter, or last month's price plus inflation.
    Placing,
    Electricity,
    Water,
    /// Company share of the month's total water bill.
    WaterShare,
    /// Company share of the month's garbage removal bill.
    GarbageShare,
    Inflation,
    Discount,
}

impl PriceRule {
    fn for_line(kind: LineItemType) -> Self {
        match kind {
            LineItemType::Maintenance => PriceRule::Maintenance,
            LineItemType::Placing => PriceRule::Placing,
            LineItemType::Electricity => PriceRule::Electricity,
            LineItemType::Water => PriceRule::Water,
            LineItemType::WaterPart => PriceRule::WaterShare,
            LineItemType::GarbageCollector => PriceRule::GarbageShare,
            LineItemType::Inflation => PriceRule::Inflation,
            LineItemType::Discount => PriceRule::Discount,
        }
    }

    fn derive(self, ctx: &PricingContext<'_>) -> Option<f64> {
        let company = ctx.company;
        let service = ctx.service;

        match self {
            PriceRule::Maintenance => company
                .and_then(|c| ready(c.service_price_per_meter))
                .or_else(|| service.and_then(|s| ready(s.rent_price))),
            PriceRule::Placing => {
                let company = company?;
                if company.inflicion {
                    let inputs = ctx.inflation?;
                    let adjustment = applied_inflation(&inputs)?;
                    Some(inflated_placing_price(inputs.previous_placing_price, adjustment))
                } else {
                    company.id?;
                    ready(company.price_per_meter)
                }
            }
            PriceRule::Electricity => service.and_then(|s| ready(s.electricity_price)),
            PriceRule::Water => service.and_then(|s| ready(s.water_price)),
            PriceRule::WaterShare => {
                let share = ready(company?.water_part)?;
                let total = service?.water_price_total?;
                Some(round2(share / 100.0 * total))
            }
            PriceRule::GarbageShare => {
                let company = company?;
                if !company.garbage_collector {
                    return None;
                }
                let price = ready(service?.garbage_collector_price)?;
                let rent_part = company.rent_part?;
                Some(round1(price / 100.0 * rent_part))
            }
            PriceRule::Inflation => {
                if !company?.inflicion {
                    return None;
                }
                ready(service?.inflicion_price)?;
                applied_inflation(&ctx.inflation?)
            }
            PriceRule::Discount => {
                let discount = company?.discount;
                (discount != 0.0).then_some(discount)
            }
        }
    }
}

// Zero counts as "not filled in yet".
fn ready(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}

/// Default price for a line, or None to leave the current value untouched.
pub fn derive_price(kind: LineItemType, ctx: &PricingContext<'_>) -> Option<f64> {
    if ctx.mode == DerivationMode::Edit {
        return None;
    }
    PriceRule::for_line(kind).derive(ctx)
}

/// Writes a derived price into the line. Returns whether the line changed.
pub fn apply_price(line: &mut LineItem, derived: Option<f64>) -> bool {
    match derived {
        Some(price) if line.price != Some(price) => {
            line.price = Some(price);
            true
        }
        _ => false,
    }
}

/// Whether the price input accepts manual edits.
pub fn price_editable(kind: LineItemType, company: Option<&Company>, mode: DerivationMode) -> bool {
    if mode == DerivationMode::Edit {
        return false;
    }
    match kind {
        LineItemType::Maintenance => false,
        LineItemType::Placing => company.is_some_and(|c| c.inflicion),
        _ => true,
    }
}
