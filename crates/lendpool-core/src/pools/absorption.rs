//! Write-off absorption waterfall.
//!
//! Layers are drained strictly in order: lender margin, platform provision,
//! platform revenue, lender principal. Each layer absorbs
//! `min(remaining, balance)` before the remainder moves to the next. Whatever
//! is left after the last layer is a permanent impairment of AUM.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PoolAmounts, PoolKind};
use crate::types::{non_negative, Money};

/// Drain order. A strict business rule.
pub const ABSORPTION_ORDER: [PoolKind; 4] = [
    PoolKind::LenderMargin,
    PoolKind::PlatformProvision,
    PoolKind::PlatformRevenue,
    PoolKind::LenderPrincipal,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsorptionResult {
    /// Pool balances after absorption
    pub pools: PoolAmounts,
    /// Amount taken from each layer
    pub absorbed: PoolAmounts,
    pub total_absorbed: Money,
    /// Portion no layer could cover
    pub unabsorbed: Money,
    /// The lender margin layer was fully consumed
    pub margin_wiped_out: bool,
}

/// Run `write_off` through the waterfall against `pools`.
pub fn absorb_write_off(pools: &PoolAmounts, write_off: Money) -> AbsorptionResult {
    let write_off = non_negative(write_off);
    let mut remaining = write_off;
    let mut balances = pools.clamped();
    let mut absorbed = PoolAmounts::default();

    for kind in ABSORPTION_ORDER {
        let balance = balances.get_mut(kind);
        let take = remaining.min(*balance);
        *balance -= take;
        *absorbed.get_mut(kind) = take;
        remaining -= take;
    }

    AbsorptionResult {
        margin_wiped_out: absorbed.lender_margin >= pools.lender_margin,
        pools: balances,
        absorbed,
        total_absorbed: write_off - remaining,
        unabsorbed: non_negative(remaining),
    }
}

/// Total capacity of all four layers.
pub fn absorption_capacity(pools: &PoolAmounts) -> Money {
    pools.clamped().total().max(Decimal::ZERO)
}
