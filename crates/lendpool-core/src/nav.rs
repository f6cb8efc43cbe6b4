//! Unit price (NAV) and unit issuance.
//!
//! Units are issued and redeemed at the price prevailing at the time of the
//! event. The price itself is derived at the end of every simulated day.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{non_negative, Money, Rate, Units};

/// Unit price before any units exist.
pub const INITIAL_UNIT_PRICE: Money = dec!(100000);

/// Default share of collected margin diverted in margin-rebidding mode.
pub const DEFAULT_MARGIN_REBIDDING_PCT: Rate = dec!(50);

const PCT_DIVISOR: Decimal = dec!(100);

/// Pricing mode, selected once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NavMode {
    /// `price = (undistributed margin + AUM) / units`; drops at every payout.
    #[default]
    #[serde(alias = "marginPool")]
    MarginPool,
    /// `rebidding_pct` of each collected margin share is diverted into AUM
    /// immediately; `price = AUM / units`.
    #[serde(alias = "marginRebidding")]
    MarginRebidding {
        #[serde(default = "default_rebidding_pct")]
        rebidding_pct: Rate,
    },
}

fn default_rebidding_pct() -> Rate {
    DEFAULT_MARGIN_REBIDDING_PCT
}

impl NavMode {
    /// Fraction (0..=1) of collected margin diverted to the rebidding accumulator.
    pub fn diverted_fraction(&self) -> Rate {
        match self {
            NavMode::MarginPool => Decimal::ZERO,
            NavMode::MarginRebidding { rebidding_pct } => {
                (*rebidding_pct / PCT_DIVISOR).clamp(Decimal::ZERO, Decimal::ONE)
            }
        }
    }

    pub fn is_margin_rebidding(&self) -> bool {
        matches!(self, NavMode::MarginRebidding { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavMode::MarginPool => "margin_pool",
            NavMode::MarginRebidding { .. } => "margin_rebidding",
        }
    }
}

/// Units issued for a contribution of `amount` at `price`.
pub fn units_for_contribution(amount: Money, price: Money) -> Units {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    non_negative(amount) / price
}

/// Units redeemed for a withdrawal of `amount` at `price`, clamped to `held`.
pub fn units_for_withdrawal(amount: Money, price: Money, held: Units) -> Units {
    units_for_contribution(amount, price).min(non_negative(held))
}

/// End-of-day unit price. `None` when no units are outstanding.
pub fn unit_price(
    mode: &NavMode,
    aum: Money,
    undistributed_margin: Money,
    total_units: Units,
) -> Option<Money> {
    if total_units <= Decimal::ZERO {
        return None;
    }
    let numerator = match mode {
        NavMode::MarginPool => undistributed_margin + aum,
        NavMode::MarginRebidding { .. } => aum,
    };
    Some(non_negative(numerator) / total_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_units_at_initial_price() {
        assert_eq!(units_for_contribution(dec!(10000000), INITIAL_UNIT_PRICE), dec!(100));
    }

    #[test]
    fn test_withdrawal_clamped_to_holding() {
        let units = units_for_withdrawal(dec!(50000000), dec!(100000), dec!(100));
        assert_eq!(units, dec!(100));
        let units = units_for_withdrawal(dec!(2000000), dec!(100000), dec!(100));
        assert_eq!(units, dec!(20));
    }

    #[test]
    fn test_margin_pool_price_includes_margin() {
        let p = unit_price(&NavMode::MarginPool, dec!(10000000), dec!(15000), dec!(100)).unwrap();
        assert_eq!(p, dec!(100150));
    }

    #[test]
    fn test_margin_rebidding_price_ignores_margin_pool() {
        let mode = NavMode::MarginRebidding { rebidding_pct: dec!(50) };
        let p = unit_price(&mode, dec!(10000000), dec!(15000), dec!(100)).unwrap();
        assert_eq!(p, dec!(100000));
    }

    #[test]
    fn test_no_units_no_price() {
        assert!(unit_price(&NavMode::MarginPool, dec!(0), dec!(0), dec!(0)).is_none());
    }

    #[test]
    fn test_diverted_fraction() {
        assert_eq!(NavMode::MarginPool.diverted_fraction(), dec!(0));
        let mode = NavMode::MarginRebidding { rebidding_pct: dec!(30) };
        assert_eq!(mode.diverted_fraction(), dec!(0.3));
    }

    #[test]
    fn test_nav_mode_accepts_camel_case_alias() {
        let mode: NavMode = serde_json::from_str(r#"{"mode":"marginRebidding"}"#).unwrap();
        assert_eq!(mode, NavMode::MarginRebidding { rebidding_pct: dec!(50) });
        let mode: NavMode = serde_json::from_str(r#"{"mode":"margin_pool"}"#).unwrap();
        assert_eq!(mode, NavMode::MarginPool);
    }

    proptest! {
        #[test]
        fn prop_contribution_round_trip_at_unchanged_price(
            amount in 1u64..1_000_000_000u64,
            price in 1u64..10_000_000u64,
        ) {
            let amount = Decimal::from(amount);
            let price = Decimal::from(price);
            let units = units_for_contribution(amount, price);
            let redeemed = units_for_withdrawal(amount, price, units);
            prop_assert_eq!(redeemed, units);
            let back = redeemed * price;
            prop_assert!((back - amount).abs() < dec!(0.000001));
        }
    }
}
