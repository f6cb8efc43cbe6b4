//! Monthly payout (coupon) distribution.
//!
//! Each lender receives `(units owned / total units) * distributable margin`.
//! Payouts never mint or burn units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LenderId, Money, Units};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LenderPayout {
    pub lender_id: LenderId,
    pub units: Units,
    pub payout: Money,
}

/// Split `distributable` across `holdings` pro rata to units held.
/// Every payout is zero when `total_units` or `distributable` is not positive.
pub fn calculate_payouts<'a, I>(holdings: I, total_units: Units, distributable: Money) -> Vec<LenderPayout>
where
    I: IntoIterator<Item = (&'a str, Units)>,
{
    let payable = total_units > Decimal::ZERO && distributable > Decimal::ZERO;
    holdings
        .into_iter()
        .map(|(lender_id, units)| {
            let payout = if payable && units > Decimal::ZERO {
                units * distributable / total_units
            } else {
                Decimal::ZERO
            };
            LenderPayout {
                lender_id: lender_id.to_string(),
                units,
                payout,
            }
        })
        .collect()
}

pub fn total_paid(payouts: &[LenderPayout]) -> Money {
    payouts.iter().map(|p| p.payout).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pro_rata_split() {
        let holdings = [("L1", dec!(75)), ("L2", dec!(25))];
        let payouts = calculate_payouts(holdings, dec!(100), dec!(40000));
        assert_eq!(payouts[0].payout, dec!(30000));
        assert_eq!(payouts[1].payout, dec!(10000));
        assert_eq!(total_paid(&payouts), dec!(40000));
    }

    #[test]
    fn test_zero_pool_pays_nothing() {
        let holdings = [("L1", dec!(75)), ("L2", dec!(25))];
        let payouts = calculate_payouts(holdings, dec!(100), Decimal::ZERO);
        assert!(payouts.iter().all(|p| p.payout.is_zero()));
        assert_eq!(payouts.len(), 2);
    }

    #[test]
    fn test_zero_units_pays_nothing() {
        let holdings = [("L1", dec!(0))];
        let payouts = calculate_payouts(holdings, dec!(0), dec!(1000));
        assert_eq!(payouts[0].payout, Decimal::ZERO);
    }

    #[test]
    fn test_negative_pool_pays_nothing() {
        let holdings = [("L1", dec!(10))];
        let payouts = calculate_payouts(holdings, dec!(10), dec!(-5));
        assert_eq!(payouts[0].payout, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_payouts_sum_to_pool(
            units in proptest::collection::vec(1u64..1_000_000u64, 1..20),
            pool in 0u64..100_000_000u64,
        ) {
            let ids: Vec<String> = (0..units.len()).map(|i| format!("L{i}")).collect();
            let holdings: Vec<(&str, Units)> = ids
                .iter()
                .zip(units.iter())
                .map(|(id, u)| (id.as_str(), Decimal::from(*u)))
                .collect();
            let total_units: Units = holdings.iter().map(|(_, u)| *u).sum();
            let pool = Decimal::from(pool);

            let payouts = calculate_payouts(holdings, total_units, pool);
            prop_assert!(payouts.iter().all(|p| p.payout >= Decimal::ZERO));
            prop_assert!((total_paid(&payouts) - pool).abs() < dec!(0.000001));
        }
    }
}
