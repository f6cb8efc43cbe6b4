//! Reporting derived from a finished simulation. Reads snapshots and payout
//! records only; never re-runs the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engine::SimulationResult;
use crate::loan::LoanOrigin;
use crate::types::{LenderId, Money, Rate, Units};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One lender's position at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LenderReturn {
    pub lender_id: LenderId,
    pub total_invested: Money,
    pub total_withdrawn: Money,
    pub total_payout: Money,
    pub units: Units,
    /// Units valued at the closing unit price of the last day
    pub position_value: Money,
    /// Cumulative payouts over invested capital, in percent (2 dp)
    pub return_rate_pct: Rate,
}

/// One lender's payout for one month close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturnRate {
    pub date: NaiveDate,
    pub lender_id: LenderId,
    pub payout: Money,
    /// Invested minus withdrawn at the close
    pub net_invested: Money,
    pub return_rate_pct: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanCounts {
    pub original: usize,
    pub rebidding: usize,
    pub margin_rebidding: usize,
}

/// Fund-level figures over the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub nav_mode: String,
    pub final_unit_price: Money,
    pub min_unit_price: Money,
    pub max_unit_price: Money,
    pub final_aum: Money,
    pub final_units: Units,
    pub total_invested: Money,
    pub total_withdrawn: Money,
    pub total_repaid: Money,
    pub total_distributed: Money,
    pub total_write_offs: Money,
    pub total_unabsorbed: Money,
    pub total_recovered: Money,
    pub peak_deficit: Money,
    pub days_in_recovery: usize,
    pub loans: LoanCounts,
}

/// Summary plus per-lender returns, as printed by the CLI `summary` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundReport {
    pub summary: FundSummary,
    pub lenders: Vec<LenderReturn>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

fn pct(numerator: Money, denominator: Money) -> Rate {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (numerator / denominator * dec!(100)).round_dp(2)
}

pub fn lender_returns(result: &SimulationResult) -> Vec<LenderReturn> {
    let closing_price = result
        .final_snapshot()
        .map(|s| s.unit_price)
        .unwrap_or(Decimal::ZERO);

    result
        .lenders
        .iter()
        .map(|(id, position)| LenderReturn {
            lender_id: id.clone(),
            total_invested: position.total_invested,
            total_withdrawn: position.total_withdrawn,
            total_payout: position.total_payout,
            units: position.units,
            position_value: position.units * closing_price,
            return_rate_pct: pct(position.total_payout, position.total_invested),
        })
        .collect()
}

pub fn monthly_return_rates(result: &SimulationResult) -> Vec<MonthlyReturnRate> {
    let mut rates = Vec::new();
    for month in &result.monthly_payouts {
        let Some(snapshot) = result.snapshot_on(month.date) else {
            continue;
        };
        for payout in &month.payouts {
            let net_invested = snapshot
                .lenders
                .get(&payout.lender_id)
                .map(|p| p.total_invested - p.total_withdrawn)
                .unwrap_or(Decimal::ZERO);
            rates.push(MonthlyReturnRate {
                date: month.date,
                lender_id: payout.lender_id.clone(),
                payout: payout.payout,
                net_invested,
                return_rate_pct: pct(payout.payout, net_invested),
            });
        }
    }
    rates
}

pub fn summarize(result: &SimulationResult) -> FundSummary {
    let prices = result.unit_prices().map(|(_, price)| price);
    let min_unit_price = prices.clone().min().unwrap_or(Decimal::ZERO);
    let max_unit_price = prices.max().unwrap_or(Decimal::ZERO);
    let last = result.final_snapshot();

    let mut loans = LoanCounts::default();
    for loan in &result.loans {
        match loan.origin {
            LoanOrigin::Original => loans.original += 1,
            LoanOrigin::Rebidding => loans.rebidding += 1,
            LoanOrigin::MarginRebidding => loans.margin_rebidding += 1,
        }
    }

    let applied = result.monthly_payouts.iter().filter_map(|m| m.absorption.as_ref());
    let (total_write_offs, total_unabsorbed) = applied.fold((Decimal::ZERO, Decimal::ZERO), |(w, u), a| {
        (w + a.total_write_off, u + a.unabsorbed)
    });

    FundSummary {
        start_date: result.start_date,
        end_date: result.end_date,
        days: result.daily.len(),
        nav_mode: result.nav_mode.label().to_string(),
        final_unit_price: last.map(|s| s.unit_price).unwrap_or(Decimal::ZERO),
        min_unit_price,
        max_unit_price,
        final_aum: last.map(|s| s.aum).unwrap_or(Decimal::ZERO),
        final_units: last.map(|s| s.total_units).unwrap_or(Decimal::ZERO),
        total_invested: last.map(|s| s.total_invested).unwrap_or(Decimal::ZERO),
        total_withdrawn: last.map(|s| s.total_withdrawn).unwrap_or(Decimal::ZERO),
        total_repaid: last.map(|s| s.total_repaid).unwrap_or(Decimal::ZERO),
        total_distributed: result.monthly_payouts.iter().map(|m| m.distributed).sum(),
        total_write_offs,
        total_unabsorbed,
        total_recovered: last.map(|s| s.total_recovered).unwrap_or(Decimal::ZERO),
        peak_deficit: result
            .daily
            .iter()
            .map(|s| s.write_off_deficit)
            .max()
            .unwrap_or(Decimal::ZERO),
        days_in_recovery: result.daily.iter().filter(|s| s.recovery_mode).count(),
        loans,
    }
}

pub fn fund_report(result: &SimulationResult) -> FundReport {
    FundReport {
        summary: summarize(result),
        lenders: lender_returns(result),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
