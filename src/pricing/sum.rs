// pricing/sum.rs
// Line totals. A line's sum is a function of its amounts and price only.

use crate::models::{LineItem, LineItemType};

use super::rounding::{round1, round2};

/// Total for one line. Missing operands yield 0.
pub fn compute_sum(
    kind: LineItemType,
    amount: Option<f64>,
    last_amount: Option<f64>,
    price: Option<f64>,
) -> f64 {
    let Some(price) = price else {
        return 0.0;
    };
    let raw = match kind {
        LineItemType::Maintenance | LineItemType::Placing => match amount {
            Some(amount) => amount * price,
            None => f64::NAN,
        },
        LineItemType::Electricity | LineItemType::Water => match (amount, last_amount) {
            (Some(current), Some(previous)) => (current - previous) * price,
            _ => f64::NAN,
        },
        // Flat charges: one unit at the derived price.
        LineItemType::GarbageCollector
        | LineItemType::Inflation
        | LineItemType::Discount
        | LineItemType::WaterPart => return if price.is_finite() { price } else { 0.0 },
    };
    round1(raw)
}

/// Recomputes the stored sum from the line's current inputs.
pub fn recompute_line(line: &mut LineItem) {
    line.sum = compute_sum(line.kind, line.amount, line.last_amount, line.price);
}

/// Invoice total across all lines.
pub fn general_sum(lines: &[LineItem]) -> f64 {
    round2(lines.iter().map(|line| line.sum).sum())
}

/// Quantity shown on the receipt: the consumption for metered lines.
pub fn displayed_quantity(line: &LineItem) -> f64 {
    match (line.amount, line.last_amount) {
        (Some(current), Some(previous)) => current - previous,
        (Some(amount), None) => amount,
        _ => 0.0,
    }
}

/// Rejects readings a stored invoice may not carry: negative or non-finite
/// amounts, and a current meter reading below the previous one.
pub fn check_readings(lines: &[LineItem]) -> Result<(), String> {
    for (idx, line) in lines.iter().enumerate() {
        for (field, value) in [("amount", line.amount), ("lastAmount", line.last_amount)] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(format!(
                        "invoice[{idx}].{field}: reading must be a non-negative number"
                    ));
                }
            }
        }
        if let (Some(current), Some(previous)) = (line.amount, line.last_amount) {
            if line.kind.is_metered() && current < previous {
                return Err(format!(
                    "invoice[{idx}].amount: current reading {current} is below previous {previous}"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metered_lines_use_reading_difference() {
        let sum = compute_sum(LineItemType::Electricity, Some(100.0), Some(40.0), Some(2.5));
        assert_eq!(sum, 150.0);
    }

    #[test]
    fn flat_rate_lines_multiply_and_round() {
        let sum = compute_sum(LineItemType::Maintenance, Some(50.0), None, Some(3.333));
        assert_eq!(sum, 166.7);
        let sum = compute_sum(LineItemType::Placing, Some(12.0), None, Some(95.0));
        assert_eq!(sum, 1140.0);
    }

    #[test]
    fn missing_operands_collapse_to_zero() {
        assert_eq!(compute_sum(LineItemType::Water, Some(10.0), None, Some(38.5)), 0.0);
        assert_eq!(compute_sum(LineItemType::Maintenance, None, None, Some(3.0)), 0.0);
        assert_eq!(compute_sum(LineItemType::Electricity, Some(1.0), Some(0.0), None), 0.0);
    }

    #[test]
    fn charges_keep_their_price() {
        assert_eq!(compute_sum(LineItemType::Discount, None, None, Some(-150.0)), -150.0);
        assert_eq!(compute_sum(LineItemType::WaterPart, None, None, Some(40.0)), 40.0);
    }

    #[test]
    fn general_sum_adds_lines() {
        let mut water = LineItem::new(LineItemType::Water);
        water.amount = Some(12.0);
        water.last_amount = Some(10.0);
        water.price = Some(38.5);
        recompute_line(&mut water);
        assert_eq!(water.sum, 77.0);
        assert_eq!(displayed_quantity(&water), 2.0);

        let mut discount = LineItem::new(LineItemType::Discount);
        discount.price = Some(-7.0);
        recompute_line(&mut discount);

        assert_eq!(general_sum(&[water, discount]), 70.0);
    }

    #[test]
    fn readings_must_be_non_negative_and_increasing() {
        let mut water = LineItem::new(LineItemType::Water);
        water.amount = Some(-5.0);
        water.last_amount = Some(10.0);
        water.price = Some(30.0);
        assert!(check_readings(std::slice::from_ref(&water)).is_err());

        water.amount = Some(5.0);
        assert!(check_readings(std::slice::from_ref(&water)).is_err());

        water.amount = Some(12.0);
        assert!(check_readings(std::slice::from_ref(&water)).is_ok());

        let mut placing = LineItem::new(LineItemType::Placing);
        placing.amount = Some(f64::NAN);
        assert!(check_readings(&[water, placing.clone()]).is_err());
        placing.amount = Some(-1.0);
        assert!(check_readings(&[placing]).is_err());
    }
}
