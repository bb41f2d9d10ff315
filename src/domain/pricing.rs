use bigdecimal::{BigDecimal, RoundingMode, Zero};

use super::order::OrderLineInput;

/// Checkout pricing knobs. Read from the environment at startup, never
/// re-derived by the core.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub free_shipping_threshold: BigDecimal,
    pub flat_shipping_fee: BigDecimal,
    /// 0 disables tax.
    pub tax_rate: BigDecimal,
}

/// Sum of unit price x quantity over all lines, kept at full precision.
/// Rounding happens only when the grand total is computed.
pub fn subtotal(lines: &[OrderLineInput]) -> BigDecimal {
    lines
        .iter()
        .map(|l| &l.unit_price * BigDecimal::from(l.quantity))
        .fold(BigDecimal::zero(), |acc, term| acc + term)
}

/// Free at or above the threshold, flat fee below it.
pub fn shipping(config: &PricingConfig, subtotal: &BigDecimal) -> BigDecimal {
    if subtotal >= &config.free_shipping_threshold {
        BigDecimal::zero()
    } else {
        config.flat_shipping_fee.clone()
    }
}

/// Subtotal x rate, rounded to 2 decimal places half-up.
pub fn tax(config: &PricingConfig, subtotal: &BigDecimal) -> BigDecimal {
    (subtotal * &config.tax_rate).with_scale_round(2, RoundingMode::HalfUp)
}

/// Subtotal + shipping + tax, rounded to 2 decimal places half-up.
pub fn total(subtotal: &BigDecimal, shipping: &BigDecimal, tax: &BigDecimal) -> BigDecimal {
    (subtotal + shipping + tax).with_scale_round(2, RoundingMode::HalfUp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn config(threshold: &str, fee: &str, rate: &str) -> PricingConfig {
        PricingConfig {
            free_shipping_threshold: dec(threshold),
            flat_shipping_fee: dec(fee),
            tax_rate: dec(rate),
        }
    }

    fn line(price: &str, quantity: i32) -> OrderLineInput {
        OrderLineInput {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: dec(price),
        }
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let lines = vec![line("9.99", 3), line("0.01", 7)];
        assert_eq!(subtotal(&lines), dec("30.04"));
    }

    #[test]
    fn subtotal_of_no_lines_is_zero() {
        assert_eq!(subtotal(&[]), BigDecimal::zero());
    }

    #[test]
    fn shipping_is_free_exactly_at_threshold() {
        let cfg = config("1000", "100", "0");
        assert_eq!(shipping(&cfg, &dec("1000.00")), BigDecimal::zero());
        assert_eq!(shipping(&cfg, &dec("1000.01")), BigDecimal::zero());
        assert_eq!(shipping(&cfg, &dec("999.99")), dec("100"));
    }

    #[test]
    fn tax_rounds_half_up() {
        let cfg = config("1000", "100", "0.1");
        // 100.05 * 0.1 = 10.005 -> 10.01
        assert_eq!(tax(&cfg, &dec("100.05")), dec("10.01"));
        // 100.04 * 0.1 = 10.004 -> 10.00
        assert_eq!(tax(&cfg, &dec("100.04")), dec("10.00"));
    }

    #[test]
    fn zero_rate_disables_tax() {
        let cfg = config("1000", "100", "0");
        assert_eq!(tax(&cfg, &dec("500")), dec("0.00"));
    }

    #[test]
    fn total_is_component_sum_to_two_places() {
        let cfg = config("1000", "100", "0.075");
        let sub = dec("800.00");
        let ship = shipping(&cfg, &sub);
        let t = tax(&cfg, &sub);
        assert_eq!(t, dec("60.00"));
        assert_eq!(total(&sub, &ship, &t), dec("960.00"));
    }

    #[test]
    fn boundary_order_totals_free_shipping() {
        // One line: qty 2 at 500.00; threshold 1000, fee 100, tax 0.
        let cfg = config("1000", "100", "0");
        let sub = subtotal(&[line("500.00", 2)]);
        assert_eq!(sub, dec("1000.00"));
        let ship = shipping(&cfg, &sub);
        let t = tax(&cfg, &sub);
        assert_eq!(ship, BigDecimal::zero());
        assert_eq!(total(&sub, &ship, &t), dec("1000.00"));
    }

    #[test]
    fn below_threshold_order_pays_flat_fee() {
        let cfg = config("1000", "100", "0");
        let sub = subtotal(&[line("400.00", 2)]);
        assert_eq!(sub, dec("800.00"));
        let ship = shipping(&cfg, &sub);
        assert_eq!(ship, dec("100"));
        let t = tax(&cfg, &sub);
        assert_eq!(total(&sub, &ship, &t), dec("900.00"));
    }
}
