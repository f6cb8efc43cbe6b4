//! Compounding loan creation.
//!
//! Whenever an accumulator holds at least one loan principal, a new weekly
//! loan starting the next day is funded from it. Paused while the fund is in
//! recovery.

use chrono::NaiveDate;
use log::debug;

use super::input::SimulationConfig;
use super::state::LedgerState;
use crate::calendar;
use crate::loan::{Loan, LoanOrigin};

/// Fund as many loans as the accumulators allow. Returns the updated state
/// and the loans created; the caller adds them to the book.
pub fn try_create_loans(
    mut state: LedgerState,
    date: NaiveDate,
    config: &SimulationConfig,
) -> (LedgerState, Vec<Loan>) {
    let mut created = Vec::new();
    if state.routing.is_recovery() {
        return (state, created);
    }
    let Some(start) = calendar::next_day(date) else {
        return (state, created);
    };
    let threshold = config.rebid_principal;

    while state.rebid_accumulator.total() >= threshold {
        let taken = state.rebid_accumulator.drain_in_order(threshold);
        debug!(
            "{date}: rebidding loan funded (original {}, rebidding {}, margin-rebidding {})",
            taken.original, taken.rebidding, taken.margin_rebidding
        );
        created.push(Loan::created(
            LoanOrigin::Rebidding,
            start,
            threshold,
            config.rebid_installment,
        ));
    }

    if config.nav_mode.is_margin_rebidding() {
        // Diverted margin already sits in AUM, so funding a loan from it
        // leaves AUM unchanged.
        while state.margin_rebid_accumulator >= threshold {
            state.margin_rebid_accumulator -= threshold;
            debug!("{date}: margin-rebidding loan funded");
            created.push(Loan::created(
                LoanOrigin::MarginRebidding,
                start,
                threshold,
                config.rebid_installment,
            ));
        }
    }

    (state, created)
}
