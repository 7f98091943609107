//! Totals arithmetic checked against an independent integer-cents
//! implementation, plus table-driven spot checks.

use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use storefront_api::services::orders::compute_totals;

/// Independent recomputation in integer cents. Tax percent is given in
/// basis points of a percent (725 = 7.25%); rounding is half away from
/// zero, matching the billing engine's contract.
fn expected_cents(line_cents: &[i64], discount_cents: i64, tax_bp: i64) -> (i64, i64, i64) {
    let subtotal: i64 = line_cents.iter().sum();
    let discount = discount_cents.max(0);
    let taxable = (subtotal - discount).max(0);
    let tax = (taxable as i128 * tax_bp as i128 + 5_000) / 10_000;
    let total = taxable as i128 + tax;
    (subtotal, tax as i64, total as i64)
}

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    #[test]
    fn total_matches_independent_computation(
        line_cents in proptest::collection::vec(0i64..1_000_000, 1..8),
        discount_cents in 0i64..500_000,
        tax_bp in 0i64..3_000,
    ) {
        let lines: Vec<Decimal> = line_cents.iter().map(|&c| cents(c)).collect();
        let totals = compute_totals(&lines, cents(discount_cents), Decimal::new(tax_bp, 2));

        let (subtotal, tax, total) = expected_cents(&line_cents, discount_cents, tax_bp);
        prop_assert_eq!(totals.subtotal, cents(subtotal));
        prop_assert_eq!(totals.tax_amount, cents(tax));
        prop_assert_eq!(totals.total_amount, cents(total));
    }

    #[test]
    fn total_never_negative(
        line_cents in proptest::collection::vec(0i64..1_000_000, 1..8),
        discount_cents in -100_000i64..2_000_000,
        tax_bp in 0i64..3_000,
    ) {
        let lines: Vec<Decimal> = line_cents.iter().map(|&c| cents(c)).collect();
        let totals = compute_totals(&lines, cents(discount_cents), Decimal::new(tax_bp, 2));
        prop_assert!(totals.total_amount >= Decimal::ZERO);
        prop_assert!(totals.tax_amount >= Decimal::ZERO);
        prop_assert!(totals.discount_amount >= Decimal::ZERO);
    }
}

#[rstest]
#[case(vec![dec!(100.00), dec!(30.00)], dec!(10.00), dec!(5), dec!(126.00))]
#[case(vec![dec!(100.00)], dec!(0), dec!(0), dec!(100.00))]
#[case(vec![dec!(19.99)], dec!(0), dec!(18), dec!(23.59))]
#[case(vec![dec!(45.00), dec!(5.00)], dec!(50.00), dec!(12), dec!(0.00))]
#[case(vec![dec!(0.01)], dec!(0), dec!(50), dec!(0.02))]
fn spot_checks(
    #[case] lines: Vec<Decimal>,
    #[case] discount: Decimal,
    #[case] tax_percent: Decimal,
    #[case] expected_total: Decimal,
) {
    let totals = compute_totals(&lines, discount, tax_percent);
    assert_eq!(totals.total_amount, expected_total);
}
