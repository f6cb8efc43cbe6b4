//! Loans and their repayment schedules.
//!
//! A loan repays a fixed installment on its schedule until cumulative
//! repayment reaches 133% of principal, or until its stop date (default).

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::types::{BorrowerId, Money};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Repayment cap as a multiple of principal (50 installments at the loan's rate).
pub const REPAYMENT_CAP_MULTIPLE: Decimal = dec!(1.33);

/// Principal assumed for an original loan when the input omits it.
pub const DEFAULT_LOAN_PRINCIPAL: Money = dec!(5000000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// When a loan's installments fall due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentSchedule {
    /// Every weekday (Saturday and Sunday skipped).
    Daily,
    /// Once a week, on the weekday of the loan's own start date.
    Weekly,
}

impl RepaymentSchedule {
    /// Whether an installment falls due on `date` for a loan starting on `start`.
    /// Does not check the start date itself.
    pub fn fires_on(self, start: NaiveDate, date: NaiveDate) -> bool {
        match self {
            RepaymentSchedule::Daily => calendar::is_weekday(date),
            RepaymentSchedule::Weekly => date.weekday() == start.weekday(),
        }
    }
}

/// Which part of the loan book a loan belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanOrigin {
    /// Supplied in the input.
    Original,
    /// Created from accumulated lender principal.
    Rebidding,
    /// Created from diverted lender margin (margin-rebidding NAV mode only).
    MarginRebidding,
}

/// An original borrower loan as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub borrower_id: BorrowerId,
    pub schedule: RepaymentSchedule,
    pub start_date: NaiveDate,
    /// Fixed per-installment repayment amount.
    pub installment_amount: Money,
    #[serde(default = "default_principal")]
    pub principal: Money,
    /// Early stop (default) date. Installments on or after this date are not paid.
    #[serde(default, alias = "repayment_stop_date", skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<NaiveDate>,
}

fn default_principal() -> Money {
    DEFAULT_LOAN_PRINCIPAL
}

/// A loan in the simulated book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    /// Borrower for original loans, `None` for system-created loans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_id: Option<BorrowerId>,
    pub origin: LoanOrigin,
    pub schedule: RepaymentSchedule,
    pub start_date: NaiveDate,
    pub installment: Money,
    pub principal: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<NaiveDate>,
    pub total_repaid: Money,
    pub installments_paid: u32,
}

impl Loan {
    pub fn original(input: &LoanInput) -> Self {
        Loan {
            borrower_id: Some(input.borrower_id.clone()),
            origin: LoanOrigin::Original,
            schedule: input.schedule,
            start_date: input.start_date,
            installment: input.installment_amount,
            principal: input.principal,
            stop_date: input.stop_date,
            total_repaid: Decimal::ZERO,
            installments_paid: 0,
        }
    }

    /// A system-created weekly loan repaying on the weekday of `start_date`.
    pub fn created(
        origin: LoanOrigin,
        start_date: NaiveDate,
        principal: Money,
        installment: Money,
    ) -> Self {
        Loan {
            borrower_id: None,
            origin,
            schedule: RepaymentSchedule::Weekly,
            start_date,
            installment,
            principal,
            stop_date: None,
            total_repaid: Decimal::ZERO,
            installments_paid: 0,
        }
    }

    pub fn repayment_cap(&self) -> Money {
        self.principal * REPAYMENT_CAP_MULTIPLE
    }

    /// Completed loans generate no further cash.
    pub fn is_completed(&self) -> bool {
        self.total_repaid >= self.repayment_cap()
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date
            && self.stop_date.map_or(true, |stop| date < stop)
            && !self.is_completed()
    }

    /// Whether an installment is collected from this loan on `date`.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        self.is_active_on(date) && self.schedule.fires_on(self.start_date, date)
    }

    /// Book one installment and return its amount.
    pub fn collect_installment(&mut self) -> Money {
        self.total_repaid += self.installment;
        self.installments_paid += 1;
        self.installment
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekly_input() -> LoanInput {
        // 2024-01-03 is a Wednesday
        LoanInput {
            borrower_id: "B1".into(),
            schedule: RepaymentSchedule::Weekly,
            start_date: d(2024, 1, 3),
            installment_amount: dec!(133000),
            principal: dec!(5000000),
            stop_date: None,
        }
    }

    #[test]
    fn test_weekly_fires_on_start_weekday() {
        let loan = Loan::original(&weekly_input());
        assert!(loan.is_due(d(2024, 1, 3)));
        assert!(!loan.is_due(d(2024, 1, 4)));
        assert!(loan.is_due(d(2024, 1, 10)));
        assert!(!loan.is_due(d(2023, 12, 27)));
    }

    #[test]
    fn test_daily_skips_weekends() {
        let mut input = weekly_input();
        input.schedule = RepaymentSchedule::Daily;
        let loan = Loan::original(&input);
        assert!(loan.is_due(d(2024, 1, 5)));
        assert!(!loan.is_due(d(2024, 1, 6)));
        assert!(!loan.is_due(d(2024, 1, 7)));
        assert!(loan.is_due(d(2024, 1, 8)));
    }

    #[test]
    fn test_stop_date_is_exclusive() {
        let mut input = weekly_input();
        input.stop_date = Some(d(2024, 1, 17));
        let loan = Loan::original(&input);
        assert!(loan.is_due(d(2024, 1, 10)));
        assert!(!loan.is_due(d(2024, 1, 17)));
        assert!(!loan.is_due(d(2024, 1, 24)));
    }

    #[test]
    fn test_cap_reached_after_fifty_installments() {
        let mut loan = Loan::original(&weekly_input());
        assert_eq!(loan.repayment_cap(), dec!(6650000));
        for _ in 0..49 {
            loan.collect_installment();
        }
        assert!(!loan.is_completed());
        loan.collect_installment();
        assert!(loan.is_completed());
        assert_eq!(loan.installments_paid, 50);
        assert!(!loan.is_due(d(2024, 1, 10)));
    }

    #[test]
    fn test_created_loan_is_weekly_from_start() {
        // 2024-02-01 is a Thursday
        let loan = Loan::created(LoanOrigin::Rebidding, d(2024, 2, 1), dec!(5000000), dec!(133000));
        assert_eq!(loan.schedule, RepaymentSchedule::Weekly);
        assert!(loan.is_due(d(2024, 2, 8)));
        assert!(!loan.is_due(d(2024, 2, 9)));
        assert!(loan.borrower_id.is_none());
    }

    #[test]
    fn test_principal_defaults_when_omitted() {
        let json = r#"{"borrower_id":"B9","schedule":"daily","start_date":"2024-01-01","installment_amount":"133000"}"#;
        let input: LoanInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.principal, DEFAULT_LOAN_PRINCIPAL);
        assert!(input.stop_date.is_none());
    }
}
