// Core services
pub mod catalog;
pub mod invoicing;
pub mod orders;
pub mod payments;
pub mod stock;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to 2 decimal places, half away from zero. The
/// result always carries exactly two decimal places so serialized amounts
/// read the same regardless of the storage backend's scale.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round2_half_rounds_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round2(dec!(2.004)), dec!(2.00));
        assert_eq!(round2(dec!(126)), dec!(126.00));
    }

    #[test]
    fn round2_pins_the_scale_to_cents() {
        assert_eq!(round2(dec!(26)).to_string(), "26.00");
        assert_eq!(round2(dec!(0)).to_string(), "0.00");
        assert_eq!(round2(dec!(-24)).to_string(), "-24.00");
    }
}
