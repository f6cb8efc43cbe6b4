use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::LendPoolError;
use crate::loan::LoanInput;
use crate::nav::{NavMode, INITIAL_UNIT_PRICE};
use crate::pools::splitter::RepaymentSplit;
use crate::types::{LenderId, Money};
use crate::LendPoolResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    #[serde(alias = "topup")]
    Deposit,
    Withdraw,
}

/// A lender's deposit or withdrawal request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub lender_id: LenderId,
    pub kind: ContributionKind,
    pub date: NaiveDate,
    pub amount: Money,
}

/// Run-wide settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Horizon length in months of 30 days.
    pub horizon_months: u32,
    pub nav_mode: NavMode,
    /// Unit price used until the first units are issued.
    pub initial_unit_price: Money,
    /// Principal of every system-created loan, and the accumulator threshold
    /// that triggers one.
    pub rebid_principal: Money,
    /// Weekly installment of every system-created loan.
    pub rebid_installment: Money,
    pub split: RepaymentSplit,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizon_months: 12,
            nav_mode: NavMode::default(),
            initial_unit_price: INITIAL_UNIT_PRICE,
            rebid_principal: dec!(5000000),
            rebid_installment: dec!(133000),
            split: RepaymentSplit::default(),
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationInput {
    #[serde(default)]
    pub contributions: Vec<Contribution>,
    #[serde(default)]
    pub loans: Vec<LoanInput>,
    #[serde(default)]
    pub config: SimulationConfig,
}

impl SimulationInput {
    /// Earliest contribution date: day one of the simulation.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.contributions.iter().map(|c| c.date).min()
    }

    /// Inclusive last simulated day.
    pub fn end_date(&self) -> Option<NaiveDate> {
        calendar::horizon_end(self.start_date()?, self.config.horizon_months)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> LendPoolError {
    LendPoolError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Check a scenario before it is handed to the engine. Returns non-fatal
/// warnings on success.
pub fn validate_input(input: &SimulationInput) -> LendPoolResult<Vec<String>> {
    let mut warnings = Vec::new();
    let cfg = &input.config;

    if cfg.horizon_months == 0 {
        return Err(invalid("horizon_months", "Horizon must be at least one month"));
    }
    if let NavMode::MarginRebidding { rebidding_pct } = cfg.nav_mode {
        if rebidding_pct < Decimal::ZERO || rebidding_pct > dec!(100) {
            return Err(invalid("nav_mode.rebidding_pct", "Must be between 0 and 100"));
        }
    }
    if cfg.initial_unit_price <= Decimal::ZERO {
        return Err(invalid("initial_unit_price", "Initial unit price must be positive"));
    }
    if cfg.rebid_principal <= Decimal::ZERO {
        return Err(invalid("rebid_principal", "Rebid principal must be positive"));
    }
    if cfg.rebid_installment <= Decimal::ZERO {
        return Err(invalid("rebid_installment", "Rebid installment must be positive"));
    }
    validate_split(&cfg.split)?;

    for (i, c) in input.contributions.iter().enumerate() {
        if c.amount <= Decimal::ZERO {
            return Err(invalid(
                format!("contributions[{i}].amount"),
                "Contribution amount must be positive",
            ));
        }
        if c.kind == ContributionKind::Withdraw {
            let has_prior_deposit = input.contributions.iter().any(|d| {
                d.lender_id == c.lender_id && d.kind == ContributionKind::Deposit && d.date <= c.date
            });
            if !has_prior_deposit {
                warnings.push(format!(
                    "Withdrawal by {} on {} has no prior deposit and will redeem nothing",
                    c.lender_id, c.date
                ));
            }
        }
    }

    let end = input.end_date();
    for (i, loan) in input.loans.iter().enumerate() {
        if loan.installment_amount <= Decimal::ZERO {
            return Err(invalid(
                format!("loans[{i}].installment_amount"),
                "Installment must be positive",
            ));
        }
        if loan.principal <= Decimal::ZERO {
            return Err(invalid(format!("loans[{i}].principal"), "Principal must be positive"));
        }
        if let Some(stop) = loan.stop_date {
            if stop < loan.start_date {
                return Err(invalid(
                    format!("loans[{i}].stop_date"),
                    "Stop date cannot precede start date",
                ));
            }
        }
        if let Some(end) = end {
            if loan.start_date > end {
                warnings.push(format!(
                    "Loan {} starts after the horizon ends ({end})",
                    loan.borrower_id
                ));
            }
            if let Some(stop) = loan.stop_date {
                if stop > end {
                    warnings.push(format!(
                        "Loan {} stops after the horizon ends; its write-off is never reached",
                        loan.borrower_id
                    ));
                }
            }
        }
    }

    Ok(warnings)
}

fn validate_split(split: &RepaymentSplit) -> LendPoolResult<()> {
    match split {
        RepaymentSplit::FixedInstallment {
            canonical_installment,
            lender_principal,
            lender_margin,
            platform_revenue,
            platform_provision,
        } => {
            let parts = [lender_principal, lender_margin, platform_revenue, platform_provision];
            if parts.iter().any(|p| **p < Decimal::ZERO) {
                return Err(invalid("split", "Split amounts cannot be negative"));
            }
            if *canonical_installment <= Decimal::ZERO {
                return Err(invalid("split.canonical_installment", "Must be positive"));
            }
            let sum: Money = parts.iter().map(|p| **p).sum();
            if sum != *canonical_installment {
                return Err(invalid(
                    "split",
                    format!("Split amounts sum to {sum}, expected {canonical_installment}"),
                ));
            }
        }
        RepaymentSplit::Ratios {
            lender_margin,
            platform_revenue,
            platform_provision,
        } => {
            let parts = [lender_margin, platform_revenue, platform_provision];
            if parts.iter().any(|p| **p < Decimal::ZERO) {
                return Err(invalid("split", "Split ratios cannot be negative"));
            }
            let sum: Decimal = parts.iter().map(|p| **p).sum();
            if sum > Decimal::ONE {
                return Err(invalid("split", "Split ratios cannot exceed 1 in total"));
            }
        }
    }
    Ok(())
}
