//! Repayment splitting.
//!
//! Each installment is divided into lender principal, lender margin,
//! platform revenue and platform provision. The canonical installment is
//! 133,000 on a 5,000,000 loan repaid over 50 installments:
//! 100,000 principal, 15,000 margin (15% of principal),
//! 17,000 platform revenue (17%) and 1,000 provision (1%).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{round_share, PoolAmounts};
use crate::types::{non_negative, Money, Rate};

pub const CANONICAL_INSTALLMENT: Money = dec!(133000);
pub const CANONICAL_PRINCIPAL: Money = dec!(100000);
pub const CANONICAL_MARGIN: Money = dec!(15000);
pub const CANONICAL_REVENUE: Money = dec!(17000);
pub const CANONICAL_PROVISION: Money = dec!(1000);

/// How an installment is decomposed into the four pools.
///
/// In both forms lender principal takes the remainder, so the four shares
/// always sum exactly to the installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepaymentSplit {
    /// Literal per-installment amounts, scaled by `amount / canonical_installment`.
    FixedInstallment {
        canonical_installment: Money,
        lender_principal: Money,
        lender_margin: Money,
        platform_revenue: Money,
        platform_provision: Money,
    },
    /// Fixed fractions of the amount.
    Ratios {
        lender_margin: Rate,
        platform_revenue: Rate,
        platform_provision: Rate,
    },
}

impl Default for RepaymentSplit {
    fn default() -> Self {
        RepaymentSplit::FixedInstallment {
            canonical_installment: CANONICAL_INSTALLMENT,
            lender_principal: CANONICAL_PRINCIPAL,
            lender_margin: CANONICAL_MARGIN,
            platform_revenue: CANONICAL_REVENUE,
            platform_provision: CANONICAL_PROVISION,
        }
    }
}

impl RepaymentSplit {
    /// Split one repayment amount.
    pub fn split(&self, amount: Money) -> PoolAmounts {
        let amount = round_share(non_negative(amount));
        let (margin, revenue, provision) = match self {
            RepaymentSplit::FixedInstallment {
                canonical_installment,
                lender_margin,
                platform_revenue,
                platform_provision,
                ..
            } => {
                if canonical_installment.is_zero() {
                    (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
                } else {
                    (
                        round_share(*lender_margin * amount / *canonical_installment),
                        round_share(*platform_revenue * amount / *canonical_installment),
                        round_share(*platform_provision * amount / *canonical_installment),
                    )
                }
            }
            RepaymentSplit::Ratios {
                lender_margin,
                platform_revenue,
                platform_provision,
            } => (
                round_share(amount * *lender_margin),
                round_share(amount * *platform_revenue),
                round_share(amount * *platform_provision),
            ),
        };

        PoolAmounts {
            lender_margin: margin,
            platform_revenue: revenue,
            platform_provision: provision,
            lender_principal: non_negative(amount - margin - revenue - provision),
        }
    }
}

/// Split with the canonical 133,000 schedule.
pub fn split_repayment(amount: Money) -> PoolAmounts {
    RepaymentSplit::default().split(amount)
}
