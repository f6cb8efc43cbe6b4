//! Month close: write-off absorption, deficit bookkeeping, payout and reset.

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

use super::input::SimulationConfig;
use super::snapshot::{MonthlyPayout, WriteOffDetail};
use super::state::LedgerState;
use crate::payout::{calculate_payouts, total_paid};
use crate::pools::absorption::absorb_write_off;
use crate::pools::{round_share, PoolAmounts};
use crate::types::non_negative;

/// Close the month ending on `date`. The caller has already repriced the
/// day; the returned state carries the post-payout price, or the initial
/// price when no units are outstanding.
pub fn close_month(
    mut state: LedgerState,
    date: NaiveDate,
    config: &SimulationConfig,
) -> (LedgerState, MonthlyPayout) {
    let write_off_amount = state.pending_write_off;
    let absorption = if write_off_amount > Decimal::ZERO {
        Some(absorb_pending(&mut state, date, config))
    } else {
        None
    };
    let pools_after_absorption = state.pools();

    let mut payouts = calculate_payouts(
        state
            .lenders
            .iter()
            .filter(|(_, p)| p.units > Decimal::ZERO)
            .map(|(id, p)| (id.as_str(), p.units)),
        state.total_units,
        state.monthly_margin,
    );
    payouts.retain(|p| p.units > Decimal::ZERO);
    for p in &payouts {
        if let Some(position) = state.lenders.get_mut(&p.lender_id) {
            position.total_payout += p.payout;
        }
    }
    let distributable = state.monthly_margin;
    let distributed = total_paid(&payouts);
    debug!(
        "{date}: month closed, distributed {distributed} across {} lenders",
        payouts.len()
    );

    let record = MonthlyPayout {
        date,
        payouts,
        total_units: state.total_units,
        distributable,
        distributed,
        write_off_amount,
        absorption,
        pools_after_absorption,
        recovery_mode: state.routing.is_recovery(),
        recovery_funneled: state.monthly_recovery_funneled,
    };

    state.monthly_margin = Decimal::ZERO;
    state.source_pools.reset_monthly();
    state.pending_write_off = Decimal::ZERO;
    state.monthly_recovery_funneled = Decimal::ZERO;
    if state.total_units > Decimal::ZERO {
        state.reprice(&config.nav_mode);
    } else {
        state.unit_price = config.initial_unit_price;
    }

    (state, record)
}

/// Run the pending write-off through the waterfall and book the outcome.
fn absorb_pending(state: &mut LedgerState, date: NaiveDate, config: &SimulationConfig) -> WriteOffDetail {
    let write_off = state.pending_write_off;
    let margin_accumulator = if config.nav_mode.is_margin_rebidding() {
        non_negative(state.margin_rebid_accumulator)
    } else {
        Decimal::ZERO
    };
    let monthly_margin = non_negative(state.monthly_margin);
    let available_margin = monthly_margin + margin_accumulator;

    let available = PoolAmounts {
        lender_margin: available_margin,
        ..state.pools()
    };
    let result = absorb_write_off(&available, write_off);

    // Split the surviving margin back over the monthly pool and the
    // rebidding accumulator in their pre-absorption proportions.
    let remaining_margin = result.pools.lender_margin;
    let (monthly_after, accumulator_after) = if available_margin > Decimal::ZERO {
        let monthly = round_share(remaining_margin * monthly_margin / available_margin).min(remaining_margin);
        (monthly, non_negative(remaining_margin - monthly))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    state.monthly_margin = monthly_after;
    if config.nav_mode.is_margin_rebidding() {
        let reduction = non_negative(margin_accumulator - accumulator_after);
        state.margin_rebid_accumulator = accumulator_after;
        state.aum -= reduction;
        state.aum_from_margin_rebidding -= reduction;
    }

    state.platform_provision = result.pools.platform_provision;
    state.platform_revenue = result.pools.platform_revenue;

    let principal_absorbed = result.absorbed.lender_principal;
    if principal_absorbed > Decimal::ZERO {
        state.principal_credited = non_negative(state.principal_credited - principal_absorbed);
        state.rebid_accumulator.reduce_proportionally(principal_absorbed);
    }

    if result.unabsorbed > Decimal::ZERO {
        state.aum -= result.unabsorbed;
        state.aum_from_investment -= result.unabsorbed;
        let entering = !state.routing.is_recovery();
        state.routing = state.routing.with_impairment(result.unabsorbed);
        if entering {
            info!(
                "{date}: write-off left {} unabsorbed, entering recovery mode",
                result.unabsorbed
            );
        }
    }
    info!(
        "{date}: write-off of {write_off} absorbed {} by pools, {} unabsorbed",
        result.total_absorbed, result.unabsorbed
    );

    WriteOffDetail {
        total_write_off: write_off,
        absorbed: result.total_absorbed,
        unabsorbed: result.unabsorbed,
        absorbed_by_pool: result.absorbed,
    }
}
