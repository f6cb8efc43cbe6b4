//! Pooled lending fund ledger.
//!
//! Lenders buy fund units, borrowers repay fixed-term loans, and every
//! repayment is split into pools that drive unit pricing, monthly payouts,
//! platform revenue and a loss reserve. The [`engine`] walks the calendar
//! one day at a time and records a snapshot of the whole ledger per day.

pub mod calendar;
pub mod error;
pub mod types;

pub mod borrower;
pub mod loan;
pub mod nav;
pub mod payout;
pub mod pools;

#[cfg(feature = "engine")]
pub mod engine;

#[cfg(feature = "report")]
pub mod report;

pub use error::LendPoolError;
pub use types::*;

/// Standard result type for all lendpool operations
pub type LendPoolResult<T> = Result<T, LendPoolError>;
