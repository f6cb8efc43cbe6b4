//! Engine output: one snapshot per simulated day plus one record per month close.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::state::{LedgerState, LenderPosition};
use crate::borrower::WriteOff;
use crate::loan::Loan;
use crate::nav::NavMode;
use crate::payout::LenderPayout;
use crate::pools::sources::{SourceBalances, SourcePools};
use crate::pools::PoolAmounts;
use crate::types::{LenderId, Money, Units};

/// What a month close did with that month's write-offs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOffDetail {
    pub total_write_off: Money,
    pub absorbed: Money,
    pub unabsorbed: Money,
    /// Amount taken from each pool
    pub absorbed_by_pool: PoolAmounts,
}

/// Ledger values at the close of one simulated day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    /// Closing unit price (after payout on month-end days).
    pub unit_price: Money,
    /// Price before the month-close payout; month-end days only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_payout_unit_price: Option<Money>,
    pub total_units: Units,
    pub aum: Money,
    pub aum_from_investment: Money,
    pub aum_from_margin_rebidding: Money,
    pub total_invested: Money,
    pub total_withdrawn: Money,
    pub total_repaid: Money,
    pub daily_repayments: SourceBalances,
    pub repaid_by_source: SourceBalances,
    /// Lender margin is the monthly payout-bound pool; lender principal is
    /// the principal awaiting rebidding.
    pub pools: PoolAmounts,
    pub principal_by_source: SourceBalances,
    /// Lender principal ever credited, net of write-off absorption.
    pub principal_credited: Money,
    pub source_pools: SourcePools,
    pub undistributed_margin: Money,
    pub margin_rebid_accumulator: Money,
    pub write_off_deficit: Money,
    pub recovery_mode: bool,
    pub total_recovered: Money,
    pub monthly_recovery_funneled: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_off: Option<WriteOffDetail>,
    pub active_loans: usize,
    pub lenders: BTreeMap<LenderId, LenderPosition>,
}

impl DailySnapshot {
    pub(crate) fn capture(
        state: &LedgerState,
        date: NaiveDate,
        mode: &NavMode,
        daily_repayments: SourceBalances,
    ) -> Self {
        DailySnapshot {
            date,
            unit_price: state.unit_price,
            pre_payout_unit_price: None,
            total_units: state.total_units,
            aum: state.aum,
            aum_from_investment: state.aum_from_investment,
            aum_from_margin_rebidding: state.aum_from_margin_rebidding,
            total_invested: state.total_invested,
            total_withdrawn: state.total_withdrawn,
            total_repaid: state.total_repaid,
            daily_repayments,
            repaid_by_source: state.repaid_by_source,
            pools: state.pools(),
            principal_by_source: state.rebid_accumulator,
            principal_credited: state.principal_credited,
            source_pools: state.source_pools,
            undistributed_margin: state.undistributed_margin(mode),
            margin_rebid_accumulator: state.margin_rebid_accumulator,
            write_off_deficit: state.routing.deficit(),
            recovery_mode: state.routing.is_recovery(),
            total_recovered: state.total_recovered,
            monthly_recovery_funneled: state.monthly_recovery_funneled,
            write_off: None,
            active_loans: state.active_loans(date),
            lenders: state.lenders.clone(),
        }
    }
}

/// One month close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPayout {
    pub date: NaiveDate,
    pub payouts: Vec<LenderPayout>,
    pub total_units: Units,
    /// Lender margin available for payout, after write-off absorption.
    pub distributable: Money,
    /// Sum of the lender payouts. Zero when no units are outstanding.
    pub distributed: Money,
    pub write_off_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absorption: Option<WriteOffDetail>,
    pub pools_after_absorption: PoolAmounts,
    pub recovery_mode: bool,
    pub recovery_funneled: Money,
}

/// Full output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub nav_mode: NavMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily: Vec<DailySnapshot>,
    pub monthly_payouts: Vec<MonthlyPayout>,
    pub write_offs: Vec<WriteOff>,
    pub loans: Vec<Loan>,
    pub lenders: BTreeMap<LenderId, LenderPosition>,
}

impl SimulationResult {
    /// Snapshot for an arbitrary simulated day.
    pub fn snapshot_on(&self, date: NaiveDate) -> Option<&DailySnapshot> {
        let offset = usize::try_from((date - self.start_date).num_days()).ok()?;
        self.daily.get(offset).filter(|s| s.date == date)
    }

    pub fn final_snapshot(&self) -> Option<&DailySnapshot> {
        self.daily.last()
    }

    pub fn unit_prices(&self) -> impl Iterator<Item = (NaiveDate, Money)> + Clone + '_ {
        self.daily.iter().map(|s| (s.date, s.unit_price))
    }
}
