//! Day-by-day fund simulation.
//!
//! [`step`] advances an explicit [`LedgerState`] by one calendar day;
//! [`simulate`] folds it over the whole horizon and keeps every daily
//! snapshot. [`run_simulation`] validates the scenario first and wraps the
//! result in the standard output envelope.

pub mod input;
pub mod month_close;
pub mod rebid;
pub mod snapshot;
pub mod state;

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::borrower::{derive_write_off, WriteOff};
use crate::calendar;
use crate::error::LendPoolError;
use crate::loan::Loan;
use crate::types::{with_metadata, ComputationOutput};
use crate::LendPoolResult;

pub use input::{validate_input, Contribution, ContributionKind, SimulationConfig, SimulationInput};
pub use month_close::close_month;
pub use rebid::try_create_loans;
pub use snapshot::{DailySnapshot, MonthlyPayout, SimulationResult, WriteOffDetail};
pub use state::{LedgerState, LenderPosition, RoutingState};

/// Everything scheduled for one simulated day.
#[derive(Debug, Clone, Default)]
pub struct DayEvents {
    pub contributions: Vec<Contribution>,
    /// Write-offs dated today. Applied at the next month close.
    pub write_offs: Vec<WriteOff>,
}

/// Advance the ledger by one day.
///
/// Order: contributions, repayments, loan creation, repricing, write-off
/// recording, then the month close when `date` is the last day of a month.
pub fn step(
    mut state: LedgerState,
    date: NaiveDate,
    events: &DayEvents,
    config: &SimulationConfig,
) -> (LedgerState, DailySnapshot, Option<MonthlyPayout>) {
    for contribution in &events.contributions {
        state.apply_contribution(contribution);
    }

    let collected = state.collect_repayments(date, config);

    let (mut state, created) = try_create_loans(state, date, config);
    state.loans.extend(created);

    state.reprice(&config.nav_mode);

    for write_off in &events.write_offs {
        state.pending_write_off += write_off.outstanding.max(Decimal::ZERO);
    }

    if !calendar::is_month_end(date) {
        let snapshot = DailySnapshot::capture(&state, date, &config.nav_mode, collected);
        return (state, snapshot, None);
    }

    let pre_payout_price = state.unit_price;
    let (state, payout) = close_month(state, date, config);
    let mut snapshot = DailySnapshot::capture(&state, date, &config.nav_mode, collected);
    snapshot.pre_payout_unit_price = Some(pre_payout_price);
    snapshot.write_off = payout.absorption.clone();
    (state, snapshot, Some(payout))
}

/// Run the whole horizon. `None` when no simulation is possible: no
/// contributions, or a horizon past the representable calendar.
pub fn simulate(input: &SimulationInput) -> Option<SimulationResult> {
    let start = input.start_date()?;
    let end = input.end_date()?;
    let config = &input.config;

    let mut events: BTreeMap<NaiveDate, DayEvents> = BTreeMap::new();
    for c in &input.contributions {
        events.entry(c.date).or_default().contributions.push(c.clone());
    }
    let write_offs: Vec<WriteOff> = input.loans.iter().filter_map(derive_write_off).collect();
    for w in write_offs.iter().filter(|w| w.write_off_date >= start && w.write_off_date <= end) {
        events.entry(w.write_off_date).or_default().write_offs.push(w.clone());
    }

    let loans = input.loans.iter().map(Loan::original).collect();
    let mut state = LedgerState::new(config, loans);
    let mut daily = Vec::new();
    let mut monthly_payouts = Vec::new();
    let quiet = DayEvents::default();

    for date in calendar::days_inclusive(start, end) {
        let today = events.get(&date).unwrap_or(&quiet);
        let (next, snapshot, payout) = step(state, date, today, config);
        state = next;
        daily.push(snapshot);
        monthly_payouts.extend(payout);
    }

    Some(SimulationResult {
        nav_mode: config.nav_mode,
        start_date: start,
        end_date: end,
        daily,
        monthly_payouts,
        write_offs,
        loans: state.loans,
        lenders: state.lenders,
    })
}

/// Validate `input`, run it, and wrap the result with metadata.
pub fn run_simulation(input: &SimulationInput) -> LendPoolResult<ComputationOutput<SimulationResult>> {
    let started = Instant::now();
    let warnings = validate_input(input)?;
    if input.start_date().is_some() && input.end_date().is_none() {
        return Err(LendPoolError::DateError(format!(
            "A {}-month horizon runs past the supported calendar",
            input.config.horizon_months
        )));
    }

    let result = simulate(input).ok_or_else(|| {
        LendPoolError::InsufficientData("At least one contribution is required to start a simulation".into())
    })?;

    let cfg = &input.config;
    let assumptions = serde_json::json!({
        "nav_mode": cfg.nav_mode.label(),
        "horizon_months": cfg.horizon_months,
        "days_per_month": calendar::DAYS_PER_HORIZON_MONTH,
        "initial_unit_price": cfg.initial_unit_price.to_string(),
        "rebid_principal": cfg.rebid_principal.to_string(),
        "rebid_installment": cfg.rebid_installment.to_string(),
        "repayment_cap_multiple": crate::loan::REPAYMENT_CAP_MULTIPLE.to_string(),
        "absorption_order": ["lender_margin", "platform_provision", "platform_revenue", "lender_principal"],
    });

    let elapsed = started.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Daily pooled-fund ledger with monthly payout and write-off absorption",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::{LoanInput, RepaymentSchedule};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn deposit(lender: &str, date: NaiveDate, amount: Decimal) -> Contribution {
        Contribution {
            lender_id: lender.into(),
            kind: ContributionKind::Deposit,
            date,
            amount,
        }
    }

    #[test]
    fn test_no_contributions_is_no_simulation() {
        let input = SimulationInput::default();
        assert!(simulate(&input).is_none());
        match run_simulation(&input).unwrap_err() {
            LendPoolError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got: {other:?}"),
        }
    }

    #[test]
    fn test_one_snapshot_per_day_inclusive() {
        let input = SimulationInput {
            contributions: vec![deposit("L1", d(2024, 1, 1), dec!(1000000))],
            config: SimulationConfig {
                horizon_months: 2,
                ..SimulationConfig::default()
            },
            ..SimulationInput::default()
        };
        let result = simulate(&input).unwrap();
        assert_eq!(result.daily.len(), 61);
        assert_eq!(result.end_date, d(2024, 3, 1));
        // January and February close inside the horizon
        assert_eq!(result.monthly_payouts.len(), 2);
        assert_eq!(result.snapshot_on(d(2024, 2, 29)).unwrap().date, d(2024, 2, 29));
        assert!(result.snapshot_on(d(2023, 12, 31)).is_none());
        assert!(result.snapshot_on(d(2024, 3, 2)).is_none());
    }

    #[test]
    fn test_step_books_deposit_before_repayment() {
        let cfg = SimulationConfig::default();
        let loan = Loan::original(&LoanInput {
            borrower_id: "B1".into(),
            schedule: RepaymentSchedule::Daily,
            start_date: d(2024, 1, 2),
            installment_amount: dec!(133000),
            principal: dec!(5000000),
            stop_date: None,
        });
        let state = LedgerState::new(&cfg, vec![loan]);
        let events = DayEvents {
            contributions: vec![deposit("L1", d(2024, 1, 2), dec!(1000000))],
            write_offs: Vec::new(),
        };

        let (state, snapshot, payout) = step(state, d(2024, 1, 2), &events, &cfg);
        assert!(payout.is_none());
        // units were issued at the initial price before the margin arrived
        assert_eq!(state.total_units, dec!(10));
        assert_eq!(snapshot.daily_repayments.original, dec!(133000));
        assert_eq!(snapshot.pools.lender_margin, dec!(15000));
        assert_eq!(snapshot.unit_price, dec!(101500));
        assert_eq!(snapshot.active_loans, 1);
    }

    #[test]
    fn test_write_off_applied_at_month_close() {
        let input = SimulationInput {
            contributions: vec![deposit("L1", d(2024, 1, 1), dec!(100000000))],
            loans: vec![LoanInput {
                borrower_id: "B1".into(),
                schedule: RepaymentSchedule::Weekly,
                start_date: d(2024, 1, 1),
                installment_amount: dec!(133000),
                principal: dec!(5000000),
                stop_date: Some(d(2024, 1, 15)),
            }],
            config: SimulationConfig {
                horizon_months: 3,
                ..SimulationConfig::default()
            },
        };
        let result = simulate(&input).unwrap();
        assert_eq!(result.write_offs.len(), 1);
        let w = &result.write_offs[0];
        assert_eq!(w.write_off_date, d(2024, 2, 1));
        // two installments (Jan 1, Jan 8) before the stop date
        assert_eq!(w.outstanding, dec!(4734000));

        let feb = result
            .monthly_payouts
            .iter()
            .find(|p| p.date == d(2024, 2, 29))
            .unwrap();
        assert_eq!(feb.write_off_amount, dec!(4734000));
        let detail = feb.absorption.as_ref().unwrap();
        assert_eq!(detail.absorbed + detail.unabsorbed, dec!(4734000));
        // January's margin was paid out; provision, revenue and unspent
        // principal of the two installments remain
        assert_eq!(detail.absorbed, dec!(236000));
        assert_eq!(detail.unabsorbed, dec!(4498000));
        assert_eq!(detail.absorbed_by_pool.lender_margin, dec!(0));
        assert!(feb.recovery_mode);
        let snap = result.snapshot_on(d(2024, 2, 29)).unwrap();
        assert_eq!(snap.write_off_deficit, detail.unabsorbed);
        assert!(snap.recovery_mode);
    }
}
