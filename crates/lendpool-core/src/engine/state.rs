//! Ledger state carried from one simulated day to the next.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::input::{Contribution, ContributionKind, SimulationConfig};
use crate::loan::{Loan, LoanOrigin};
use crate::nav::{self, NavMode};
use crate::pools::sources::{SourceBalances, SourcePools};
use crate::pools::{round_share, PoolAmounts};
use crate::types::{non_negative, LenderId, Money, Units};

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Fund-wide repayment routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoutingState {
    #[default]
    Normal,
    /// A write-off impaired AUM by more than the pools could absorb.
    /// Margin, principal and provision shares repay `deficit` first.
    Recovery { deficit: Money },
}

/// Outcome of routing one installment's split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutedRepayment {
    /// Shares that reach the pools.
    pub to_pools: PoolAmounts,
    /// Amount funneled into AUM to repay the deficit.
    pub recovered: Money,
    pub next: RoutingState,
}

impl RoutingState {
    pub fn deficit(&self) -> Money {
        match self {
            RoutingState::Normal => Decimal::ZERO,
            RoutingState::Recovery { deficit } => *deficit,
        }
    }

    pub fn is_recovery(&self) -> bool {
        matches!(self, RoutingState::Recovery { .. })
    }

    fn from_deficit(deficit: Money) -> Self {
        if deficit > Decimal::ZERO {
            RoutingState::Recovery { deficit }
        } else {
            RoutingState::Normal
        }
    }

    /// Add an unabsorbed write-off remainder to the deficit.
    pub fn with_impairment(self, amount: Money) -> Self {
        RoutingState::from_deficit(self.deficit() + non_negative(amount))
    }

    /// Route one installment's split shares.
    ///
    /// Platform revenue always reaches its pool. In recovery the other three
    /// shares repay the deficit first; once it is cleared the rest goes back
    /// to those pools in the original proportions.
    pub fn route(self, shares: PoolAmounts) -> RoutedRepayment {
        let deficit = match self {
            RoutingState::Normal => {
                return RoutedRepayment {
                    to_pools: shares,
                    recovered: Decimal::ZERO,
                    next: self,
                }
            }
            RoutingState::Recovery { deficit } => deficit,
        };

        let recoverable = shares.recoverable();
        if recoverable <= deficit {
            return RoutedRepayment {
                to_pools: PoolAmounts {
                    platform_revenue: shares.platform_revenue,
                    ..PoolAmounts::default()
                },
                recovered: recoverable,
                next: RoutingState::from_deficit(deficit - recoverable),
            };
        }

        let remainder = recoverable - deficit;
        let margin = round_share(remainder * shares.lender_margin / recoverable);
        let provision = round_share(remainder * shares.platform_provision / recoverable);
        RoutedRepayment {
            to_pools: PoolAmounts {
                lender_margin: margin,
                platform_provision: provision,
                lender_principal: non_negative(remainder - margin - provision),
                platform_revenue: shares.platform_revenue,
            },
            recovered: deficit,
            next: RoutingState::Normal,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LenderPosition {
    pub units: Units,
    pub total_invested: Money,
    pub total_withdrawn: Money,
    pub total_payout: Money,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Every balance the engine carries across days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    pub unit_price: Money,
    pub total_units: Units,
    pub aum: Money,
    pub aum_from_investment: Money,
    pub aum_from_margin_rebidding: Money,
    pub total_invested: Money,
    pub total_withdrawn: Money,
    pub total_repaid: Money,
    pub repaid_by_source: SourceBalances,
    pub lenders: BTreeMap<LenderId, LenderPosition>,

    /// Payout-bound lender margin for the current month.
    pub monthly_margin: Money,
    pub platform_provision: Money,
    pub platform_revenue: Money,
    /// Lender principal ever credited, net of write-off absorption.
    pub principal_credited: Money,
    /// Principal not yet consumed by a rebidding loan, by origin.
    pub rebid_accumulator: SourceBalances,
    /// Diverted margin awaiting a margin-rebidding loan. Already inside AUM.
    pub margin_rebid_accumulator: Money,
    pub source_pools: SourcePools,

    pub routing: RoutingState,
    pub total_recovered: Money,
    pub monthly_recovery_funneled: Money,
    /// Write-offs dated this month, applied at month close.
    pub pending_write_off: Money,

    pub loans: Vec<Loan>,
}

impl LedgerState {
    pub fn new(config: &SimulationConfig, loans: Vec<Loan>) -> Self {
        LedgerState {
            unit_price: config.initial_unit_price,
            total_units: Decimal::ZERO,
            aum: Decimal::ZERO,
            aum_from_investment: Decimal::ZERO,
            aum_from_margin_rebidding: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            total_repaid: Decimal::ZERO,
            repaid_by_source: SourceBalances::default(),
            lenders: BTreeMap::new(),
            monthly_margin: Decimal::ZERO,
            platform_provision: Decimal::ZERO,
            platform_revenue: Decimal::ZERO,
            principal_credited: Decimal::ZERO,
            rebid_accumulator: SourceBalances::default(),
            margin_rebid_accumulator: Decimal::ZERO,
            source_pools: SourcePools::default(),
            routing: RoutingState::Normal,
            total_recovered: Decimal::ZERO,
            monthly_recovery_funneled: Decimal::ZERO,
            pending_write_off: Decimal::ZERO,
            loans,
        }
    }

    /// Current balances of the four pools. Lender principal is the
    /// principal still awaiting rebidding.
    pub fn pools(&self) -> PoolAmounts {
        PoolAmounts {
            lender_margin: self.monthly_margin,
            lender_principal: self.rebid_accumulator.total(),
            platform_provision: self.platform_provision,
            platform_revenue: self.platform_revenue,
        }
    }

    /// Margin not yet paid out: the monthly pool in margin-pool mode, the
    /// rebidding accumulator in margin-rebidding mode.
    pub fn undistributed_margin(&self, mode: &NavMode) -> Money {
        match mode {
            NavMode::MarginPool => self.monthly_margin,
            NavMode::MarginRebidding { .. } => self.margin_rebid_accumulator,
        }
    }

    /// Issue or redeem units for one contribution at the current price.
    pub fn apply_contribution(&mut self, c: &Contribution) {
        let price = self.unit_price;
        let position = self.lenders.entry(c.lender_id.clone()).or_default();
        match c.kind {
            ContributionKind::Deposit => {
                let units = nav::units_for_contribution(c.amount, price);
                position.units += units;
                position.total_invested += c.amount;
                self.total_units += units;
                self.aum += c.amount;
                self.aum_from_investment += c.amount;
                self.total_invested += c.amount;
            }
            ContributionKind::Withdraw => {
                let units = nav::units_for_withdrawal(c.amount, price, position.units);
                let cash = units * price;
                position.units = non_negative(position.units - units);
                position.total_withdrawn += cash;
                self.total_units = non_negative(self.total_units - units);
                // may go below zero when the price carries undistributed margin
                self.aum -= cash;
                self.aum_from_investment -= cash;
                self.total_withdrawn += cash;
            }
        }
    }

    /// Collect every installment due on `date` and book it.
    /// Returns the amounts collected per origin.
    pub fn collect_repayments(&mut self, date: NaiveDate, config: &SimulationConfig) -> SourceBalances {
        let mut collected = SourceBalances::default();
        let mut loans = std::mem::take(&mut self.loans);
        for loan in loans.iter_mut().filter(|l| l.is_due(date)) {
            let amount = loan.collect_installment();
            self.book_installment(loan.origin, amount, date, config);
            collected.credit(loan.origin, amount);
        }
        self.loans = loans;
        collected
    }

    fn book_installment(
        &mut self,
        origin: LoanOrigin,
        amount: Money,
        date: NaiveDate,
        config: &SimulationConfig,
    ) {
        let shares = config.split.split(amount);
        let was_recovery = self.routing.is_recovery();
        let routed = self.routing.route(shares);
        self.routing = routed.next;

        if routed.recovered > Decimal::ZERO {
            self.aum += routed.recovered;
            self.aum_from_investment += routed.recovered;
            self.total_recovered += routed.recovered;
            self.monthly_recovery_funneled += routed.recovered;
        }
        if was_recovery && !self.routing.is_recovery() {
            info!("{date}: write-off deficit repaid, leaving recovery mode");
        }

        let mut credited = routed.to_pools;
        let diverted = round_share(credited.lender_margin * config.nav_mode.diverted_fraction());
        if diverted > Decimal::ZERO {
            self.margin_rebid_accumulator += diverted;
            self.aum += diverted;
            self.aum_from_margin_rebidding += diverted;
            credited.lender_margin -= diverted;
        }

        self.monthly_margin += credited.lender_margin;
        self.platform_provision += credited.platform_provision;
        self.platform_revenue += credited.platform_revenue;
        self.principal_credited += credited.lender_principal;
        self.rebid_accumulator.credit(origin, credited.lender_principal);
        self.source_pools.credit(origin, &credited);

        self.total_repaid += amount;
        self.repaid_by_source.credit(origin, amount);
    }

    /// Re-derive the unit price from current balances. Keeps the previous
    /// price while no units are outstanding; the month close resets it.
    pub fn reprice(&mut self, mode: &NavMode) {
        if let Some(price) = nav::unit_price(mode, self.aum, self.undistributed_margin(mode), self.total_units) {
            self.unit_price = price;
        }
    }

    pub fn active_loans(&self, date: NaiveDate) -> usize {
        self.loans.iter().filter(|l| l.is_active_on(date)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::splitter::split_repayment;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normal_routing_passes_shares_through() {
        let shares = split_repayment(dec!(133000));
        let routed = RoutingState::Normal.route(shares);
        assert_eq!(routed.to_pools, shares);
        assert_eq!(routed.recovered, dec!(0));
        assert_eq!(routed.next, RoutingState::Normal);
    }

    #[test]
    fn test_recovery_absorbs_whole_portion() {
        let shares = split_repayment(dec!(133000));
        let routed = RoutingState::Recovery { deficit: dec!(500000) }.route(shares);
        assert_eq!(routed.recovered, dec!(116000));
        assert_eq!(routed.to_pools.lender_margin, dec!(0));
        assert_eq!(routed.to_pools.lender_principal, dec!(0));
        assert_eq!(routed.to_pools.platform_provision, dec!(0));
        assert_eq!(routed.to_pools.platform_revenue, dec!(17000));
        assert_eq!(routed.next, RoutingState::Recovery { deficit: dec!(384000) });
    }

    #[test]
    fn test_recovery_exact_clear_returns_to_normal() {
        let shares = split_repayment(dec!(133000));
        let routed = RoutingState::Recovery { deficit: dec!(116000) }.route(shares);
        assert_eq!(routed.recovered, dec!(116000));
        assert_eq!(routed.next, RoutingState::Normal);
        assert_eq!(routed.to_pools.recoverable(), dec!(0));
    }

    #[test]
    fn test_recovery_clears_mid_installment() {
        let shares = split_repayment(dec!(133000));
        let routed = RoutingState::Recovery { deficit: dec!(10000) }.route(shares);
        assert_eq!(routed.recovered, dec!(10000));
        assert_eq!(routed.next, RoutingState::Normal);
        let pools = routed.to_pools;
        assert_eq!(pools.recoverable(), dec!(106000));
        assert_eq!(pools.platform_revenue, dec!(17000));
        // 15 : 100 : 1
        assert!((pools.lender_margin - dec!(106000) * dec!(15) / dec!(116)).abs() < dec!(0.0000001));
        assert!((pools.platform_provision - dec!(106000) / dec!(116)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_impairment_enters_recovery() {
        let state = RoutingState::Normal.with_impairment(dec!(2500));
        assert_eq!(state, RoutingState::Recovery { deficit: dec!(2500) });
        assert_eq!(RoutingState::Normal.with_impairment(dec!(0)), RoutingState::Normal);
    }

    #[test]
    fn test_withdrawal_clamped_and_booked_at_price() {
        let cfg = SimulationConfig::default();
        let mut state = LedgerState::new(&cfg, Vec::new());
        state.apply_contribution(&Contribution {
            lender_id: "L1".into(),
            kind: ContributionKind::Deposit,
            date: d(2024, 1, 1),
            amount: dec!(1000000),
        });
        assert_eq!(state.total_units, dec!(10));
        state.apply_contribution(&Contribution {
            lender_id: "L1".into(),
            kind: ContributionKind::Withdraw,
            date: d(2024, 1, 2),
            amount: dec!(5000000),
        });
        assert_eq!(state.total_units, dec!(0));
        assert_eq!(state.aum, dec!(0));
        assert_eq!(state.total_withdrawn, dec!(1000000));
        assert_eq!(state.lenders["L1"].total_withdrawn, dec!(1000000));
    }

    #[test]
    fn test_withdrawal_priced_above_aum_books_both_counters() {
        let cfg = SimulationConfig::default();
        let mut state = LedgerState::new(&cfg, Vec::new());
        state.apply_contribution(&Contribution {
            lender_id: "L1".into(),
            kind: ContributionKind::Deposit,
            date: d(2024, 1, 1),
            amount: dec!(1000000),
        });
        state.monthly_margin = dec!(15000);
        state.reprice(&cfg.nav_mode);
        assert_eq!(state.unit_price, dec!(101500));

        state.apply_contribution(&Contribution {
            lender_id: "L1".into(),
            kind: ContributionKind::Withdraw,
            date: d(2024, 1, 2),
            amount: dec!(5000000),
        });
        // the redeemed value includes the undistributed margin
        assert_eq!(state.total_withdrawn, dec!(1015000));
        assert_eq!(state.aum, dec!(-15000));
        assert_eq!(state.aum_from_investment, dec!(-15000));
        assert_eq!(state.aum, state.aum_from_investment + state.aum_from_margin_rebidding);
    }

    #[test]
    fn test_margin_diverted_into_aum_in_rebidding_mode() {
        let cfg = SimulationConfig {
            nav_mode: NavMode::MarginRebidding { rebidding_pct: dec!(40) },
            ..SimulationConfig::default()
        };
        let mut state = LedgerState::new(&cfg, Vec::new());
        state.book_installment(LoanOrigin::Original, dec!(133000), d(2024, 1, 2), &cfg);
        assert_eq!(state.margin_rebid_accumulator, dec!(6000));
        assert_eq!(state.aum, dec!(6000));
        assert_eq!(state.aum_from_margin_rebidding, dec!(6000));
        assert_eq!(state.monthly_margin, dec!(9000));
        assert_eq!(state.rebid_accumulator.original, dec!(100000));
    }
}
