//! Balances attributed to the loan origin that produced them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{round_share, PoolAmounts};
use crate::loan::LoanOrigin;
use crate::types::{non_negative, Money};

/// Drain order when a rebidding loan consumes accumulated principal.
pub const SOURCE_DRAIN_ORDER: [LoanOrigin; 3] = [
    LoanOrigin::Original,
    LoanOrigin::Rebidding,
    LoanOrigin::MarginRebidding,
];

/// One balance per loan origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBalances {
    pub original: Money,
    pub rebidding: Money,
    pub margin_rebidding: Money,
}

impl SourceBalances {
    pub fn get(&self, origin: LoanOrigin) -> Money {
        match origin {
            LoanOrigin::Original => self.original,
            LoanOrigin::Rebidding => self.rebidding,
            LoanOrigin::MarginRebidding => self.margin_rebidding,
        }
    }

    fn get_mut(&mut self, origin: LoanOrigin) -> &mut Money {
        match origin {
            LoanOrigin::Original => &mut self.original,
            LoanOrigin::Rebidding => &mut self.rebidding,
            LoanOrigin::MarginRebidding => &mut self.margin_rebidding,
        }
    }

    pub fn credit(&mut self, origin: LoanOrigin, amount: Money) {
        *self.get_mut(origin) += amount;
    }

    pub fn total(&self) -> Money {
        self.original + self.rebidding + self.margin_rebidding
    }

    /// Deduct `amount` source by source in [`SOURCE_DRAIN_ORDER`].
    /// Returns the amount taken from each source; anything beyond the total
    /// balance is ignored.
    pub fn drain_in_order(&mut self, amount: Money) -> SourceBalances {
        let mut remaining = non_negative(amount);
        let mut taken = SourceBalances::default();
        for origin in SOURCE_DRAIN_ORDER {
            let balance = self.get_mut(origin);
            let take = remaining.min(non_negative(*balance));
            *balance -= take;
            *taken.get_mut(origin) = take;
            remaining -= take;
        }
        taken
    }

    /// Deduct `amount` from every source in proportion to its share of the
    /// total. Balances are clamped at zero.
    pub fn reduce_proportionally(&mut self, amount: Money) {
        let total = self.total();
        if total <= Decimal::ZERO || amount <= Decimal::ZERO {
            return;
        }
        if amount >= total {
            *self = SourceBalances::default();
            return;
        }
        let from_original = round_share(amount * self.original / total);
        let from_rebidding = round_share(amount * self.rebidding / total);
        let from_margin = amount - from_original - from_rebidding;
        self.original = non_negative(self.original - from_original);
        self.rebidding = non_negative(self.rebidding - from_rebidding);
        self.margin_rebidding = non_negative(self.margin_rebidding - from_margin);
    }
}

/// Pool credits per origin, kept for reporting. Lender margin is the
/// current month's credit; the other three are cumulative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePools {
    pub original: PoolAmounts,
    pub rebidding: PoolAmounts,
    pub margin_rebidding: PoolAmounts,
}

impl SourcePools {
    pub fn credit(&mut self, origin: LoanOrigin, shares: &PoolAmounts) {
        match origin {
            LoanOrigin::Original => self.original.add(shares),
            LoanOrigin::Rebidding => self.rebidding.add(shares),
            LoanOrigin::MarginRebidding => self.margin_rebidding.add(shares),
        }
    }

    /// Month close: monthly margin sub-pools restart from zero.
    pub fn reset_monthly(&mut self) {
        self.original.lender_margin = Decimal::ZERO;
        self.rebidding.lender_margin = Decimal::ZERO;
        self.margin_rebidding.lender_margin = Decimal::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drain_original_first() {
        let mut s = SourceBalances {
            original: dec!(3000000),
            rebidding: dec!(1500000),
            margin_rebidding: dec!(800000),
        };
        let taken = s.drain_in_order(dec!(5000000));
        assert_eq!(taken.original, dec!(3000000));
        assert_eq!(taken.rebidding, dec!(1500000));
        assert_eq!(taken.margin_rebidding, dec!(500000));
        assert_eq!(s.original, dec!(0));
        assert_eq!(s.rebidding, dec!(0));
        assert_eq!(s.margin_rebidding, dec!(300000));
    }

    #[test]
    fn test_drain_stops_at_first_source_when_sufficient() {
        let mut s = SourceBalances {
            original: dec!(6000000),
            rebidding: dec!(100),
            margin_rebidding: dec!(0),
        };
        s.drain_in_order(dec!(5000000));
        assert_eq!(s.original, dec!(1000000));
        assert_eq!(s.rebidding, dec!(100));
    }

    #[test]
    fn test_reduce_proportionally() {
        let mut s = SourceBalances {
            original: dec!(600),
            rebidding: dec!(300),
            margin_rebidding: dec!(100),
        };
        s.reduce_proportionally(dec!(500));
        assert_eq!(s.original, dec!(300));
        assert_eq!(s.rebidding, dec!(150));
        assert_eq!(s.margin_rebidding, dec!(50));
        assert_eq!(s.total(), dec!(500));
    }

    #[test]
    fn test_reduce_beyond_total_clears() {
        let mut s = SourceBalances {
            original: dec!(10),
            rebidding: dec!(5),
            margin_rebidding: dec!(0),
        };
        s.reduce_proportionally(dec!(100));
        assert_eq!(s, SourceBalances::default());
    }

    #[test]
    fn test_monthly_reset_keeps_cumulative_pools() {
        let mut pools = SourcePools::default();
        let shares = PoolAmounts {
            lender_margin: dec!(15000),
            lender_principal: dec!(100000),
            platform_provision: dec!(1000),
            platform_revenue: dec!(17000),
        };
        pools.credit(LoanOrigin::Rebidding, &shares);
        pools.reset_monthly();
        assert_eq!(pools.rebidding.lender_margin, dec!(0));
        assert_eq!(pools.rebidding.platform_revenue, dec!(17000));
        assert_eq!(pools.original, PoolAmounts::default());
    }
}
