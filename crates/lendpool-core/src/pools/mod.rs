pub mod absorption;
pub mod sources;
pub mod splitter;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{non_negative, Money};

/// The four sub-accounts a repayment is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    LenderMargin,
    LenderPrincipal,
    PlatformProvision,
    PlatformRevenue,
}

/// One amount per pool: used both for a repayment's split shares and for
/// pool balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolAmounts {
    pub lender_margin: Money,
    pub lender_principal: Money,
    pub platform_provision: Money,
    pub platform_revenue: Money,
}

impl PoolAmounts {
    pub fn get(&self, kind: PoolKind) -> Money {
        match kind {
            PoolKind::LenderMargin => self.lender_margin,
            PoolKind::LenderPrincipal => self.lender_principal,
            PoolKind::PlatformProvision => self.platform_provision,
            PoolKind::PlatformRevenue => self.platform_revenue,
        }
    }

    pub fn get_mut(&mut self, kind: PoolKind) -> &mut Money {
        match kind {
            PoolKind::LenderMargin => &mut self.lender_margin,
            PoolKind::LenderPrincipal => &mut self.lender_principal,
            PoolKind::PlatformProvision => &mut self.platform_provision,
            PoolKind::PlatformRevenue => &mut self.platform_revenue,
        }
    }

    pub fn total(&self) -> Money {
        self.lender_margin + self.lender_principal + self.platform_provision + self.platform_revenue
    }

    /// Margin + principal + provision: the shares redirected during recovery.
    pub fn recoverable(&self) -> Money {
        self.lender_margin + self.lender_principal + self.platform_provision
    }

    pub fn add(&mut self, other: &PoolAmounts) {
        self.lender_margin += other.lender_margin;
        self.lender_principal += other.lender_principal;
        self.platform_provision += other.platform_provision;
        self.platform_revenue += other.platform_revenue;
    }

    pub fn clamped(self) -> Self {
        PoolAmounts {
            lender_margin: non_negative(self.lender_margin),
            lender_principal: non_negative(self.lender_principal),
            platform_provision: non_negative(self.platform_provision),
            platform_revenue: non_negative(self.platform_revenue),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.lender_margin.is_zero()
            && self.lender_principal.is_zero()
            && self.platform_provision.is_zero()
            && self.platform_revenue.is_zero()
    }
}

/// Decimal places kept on every pool share, so that sums of shares stay exact.
pub const SHARE_SCALE: u32 = 10;

/// Round a derived share to [`SHARE_SCALE`].
pub fn round_share(value: Decimal) -> Decimal {
    value.round_dp(SHARE_SCALE)
}
