//! IVA bracket aggregation.
//!
//! Pure functions, no I/O. Prices are VAT-inclusive guaraní amounts; the VAT
//! portion of a line is `total × rate/(100+rate)`, rounded to whole guaraníes.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::entities::sale::{LineItem, TaxTotals};
use crate::models::sale::IvaRate;

/// Declared per-line VAT may differ from the recomputed value by at most one
/// guaraní (client-side rounding).
const DECLARED_IVA_TOLERANCE: Decimal = dec!(1);

/// VAT portion contained in a VAT-inclusive price.
pub fn iva_amount(total_price: Decimal, rate: IvaRate) -> Decimal {
    let pct = rate.percent();
    if pct.is_zero() {
        return Decimal::ZERO;
    }
    (total_price * pct / (Decimal::ONE_HUNDRED + pct))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a client-declared VAT amount is consistent with the recomputed one.
pub fn declared_iva_is_consistent(declared: Decimal, computed: Decimal) -> bool {
    (declared - computed).abs() <= DECLARED_IVA_TOLERANCE
}

/// Derives the per-bracket totals from a sale's line items.
///
/// Each line's net base is `total_price - iva_amount`; base and VAT
/// accumulate into the bucket selected by the line's rate. Exempt lines
/// contribute their full price to `exenta`. An empty slice yields all-zero
/// totals; emptiness is rejected upstream, a sale requires at least one item.
pub fn aggregate(items: &[LineItem]) -> TaxTotals {
    let mut totals = TaxTotals::default();

    for item in items {
        let iva = iva_amount(item.total_price, item.iva_rate);
        let base = item.total_price - iva;
        match item.iva_rate {
            IvaRate::Ten => {
                totals.gravada10 += base;
                totals.iva10 += iva;
            }
            IvaRate::Five => {
                totals.gravada5 += base;
                totals.iva5 += iva;
            }
            IvaRate::Exempt => {
                totals.exenta += item.total_price;
            }
        }
    }

    totals
}

/// Sum of all VAT-inclusive line totals.
pub fn total_amount(items: &[LineItem]) -> Decimal {
    items.iter().map(|item| item.total_price).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;
    use uuid::Uuid;

    fn item(rate: IvaRate, total: Decimal) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            variant_id: None,
            name: "Milanesa".to_string(),
            unit: None,
            quantity: 1,
            iva_rate: rate,
            iva_amount: iva_amount(total, rate),
            total_price: total,
        }
    }

    #[test_case(dec!(11000), IvaRate::Ten, dec!(1000) ; "10 percent bracket")]
    #[test_case(dec!(5500), IvaRate::Ten, dec!(500) ; "10 percent, half price")]
    #[test_case(dec!(5250), IvaRate::Five, dec!(250) ; "5 percent bracket")]
    #[test_case(dec!(7000), IvaRate::Exempt, dec!(0) ; "exempt has no VAT")]
    #[test_case(dec!(0), IvaRate::Ten, dec!(0) ; "zero price")]
    fn iva_amount_per_bracket(total: Decimal, rate: IvaRate, expected: Decimal) {
        assert_eq!(iva_amount(total, rate), expected);
    }

    #[test]
    fn aggregates_ten_percent_items() {
        let items = vec![
            item(IvaRate::Ten, dec!(11000)),
            item(IvaRate::Ten, dec!(5500)),
        ];
        let totals = aggregate(&items);

        assert_eq!(totals.gravada10, dec!(15000));
        assert_eq!(totals.iva10, dec!(1500));
        assert_eq!(totals.gravada5, dec!(0));
        assert_eq!(totals.iva5, dec!(0));
        assert_eq!(totals.exenta, dec!(0));
        assert_eq!(total_amount(&items), dec!(16500));
    }

    #[test]
    fn aggregates_mixed_brackets() {
        let items = vec![
            item(IvaRate::Ten, dec!(11000)),
            item(IvaRate::Five, dec!(5250)),
            item(IvaRate::Exempt, dec!(3000)),
        ];
        let totals = aggregate(&items);

        assert_eq!(totals.gravada10, dec!(10000));
        assert_eq!(totals.iva10, dec!(1000));
        assert_eq!(totals.gravada5, dec!(5000));
        assert_eq!(totals.iva5, dec!(250));
        assert_eq!(totals.exenta, dec!(3000));
    }

    #[test]
    fn empty_items_yield_zero_totals() {
        let totals = aggregate(&[]);
        assert_eq!(totals, TaxTotals::default());
    }

    #[test]
    fn declared_iva_tolerance() {
        assert!(declared_iva_is_consistent(dec!(1000), dec!(1000)));
        assert!(declared_iva_is_consistent(dec!(999), dec!(1000)));
        assert!(declared_iva_is_consistent(dec!(1001), dec!(1000)));
        assert!(!declared_iva_is_consistent(dec!(998), dec!(1000)));
        assert!(!declared_iva_is_consistent(dec!(0), dec!(1000)));
    }

    proptest! {
        // For every bracket: gravada + iva equals the sum of that bracket's
        // VAT-inclusive totals.
        #[test]
        fn bracket_sums_are_consistent(prices in prop::collection::vec((0u8..3, 0i64..10_000_000), 0..24)) {
            let items: Vec<LineItem> = prices
                .iter()
                .map(|(bucket, price)| {
                    let rate = match bucket {
                        0 => IvaRate::Exempt,
                        1 => IvaRate::Five,
                        _ => IvaRate::Ten,
                    };
                    item(rate, Decimal::from(*price))
                })
                .collect();

            let totals = aggregate(&items);

            let sum_for = |rate: IvaRate| -> Decimal {
                items
                    .iter()
                    .filter(|i| i.iva_rate == rate)
                    .map(|i| i.total_price)
                    .sum()
            };

            prop_assert_eq!(totals.gravada10 + totals.iva10, sum_for(IvaRate::Ten));
            prop_assert_eq!(totals.gravada5 + totals.iva5, sum_for(IvaRate::Five));
            prop_assert_eq!(totals.exenta, sum_for(IvaRate::Exempt));
            prop_assert_eq!(
                totals.gravada10 + totals.iva10 + totals.gravada5 + totals.iva5 + totals.exenta,
                total_amount(&items)
            );
        }
    }
}
