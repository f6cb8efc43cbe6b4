//! Write-off derivation for defaulted borrowers.
//!
//! A borrower with a stop date is written off on the 1st of the month after
//! the stop date, for the principal not yet covered by installments paid.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::loan::{LoanInput, RepaymentSchedule, REPAYMENT_CAP_MULTIPLE};
use crate::types::{BorrowerId, Money};

/// A scheduled write-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOff {
    pub borrower_id: BorrowerId,
    pub stop_date: NaiveDate,
    pub write_off_date: NaiveDate,
    pub outstanding: Money,
}

/// 1st of the calendar month after the month containing `stop_date`.
pub fn write_off_date(stop_date: NaiveDate) -> Option<NaiveDate> {
    calendar::first_of_next_month(stop_date)
}

/// Installments falling due from `start` (inclusive) to `stop` (exclusive).
pub fn count_installments(start: NaiveDate, schedule: RepaymentSchedule, stop: NaiveDate) -> u32 {
    calendar::days_inclusive(start, stop)
        .filter(|date| *date < stop && schedule.fires_on(start, *date))
        .fold(0u32, |n, _| n.saturating_add(1))
}

/// Installments needed to reach the 133% repayment cap, rounded down.
pub fn max_installments(principal: Money, installment: Money) -> u32 {
    if installment <= Decimal::ZERO {
        return 0;
    }
    (principal * REPAYMENT_CAP_MULTIPLE / installment)
        .floor()
        .to_u32()
        .unwrap_or(u32::MAX)
}

/// `max(0, principal - min(paid, max_installments) * installment)`.
pub fn write_off_outstanding(
    start: NaiveDate,
    schedule: RepaymentSchedule,
    stop: NaiveDate,
    installment: Money,
    principal: Money,
) -> Money {
    let paid = count_installments(start, schedule, stop).min(max_installments(principal, installment));
    let repaid = Decimal::from(paid) * installment;
    (principal - repaid).max(Decimal::ZERO)
}

/// Derive the write-off for a loan input; `None` when the loan has no stop date.
pub fn derive_write_off(loan: &LoanInput) -> Option<WriteOff> {
    let stop = loan.stop_date?;
    let date = write_off_date(stop)?;
    Some(WriteOff {
        borrower_id: loan.borrower_id.clone(),
        stop_date: stop,
        write_off_date: date,
        outstanding: write_off_outstanding(
            loan.start_date,
            loan.schedule,
            stop,
            loan.installment_amount,
            loan.principal,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_write_off_date_is_first_of_following_month() {
        assert_eq!(write_off_date(d(2024, 3, 15)), Some(d(2024, 4, 1)));
        assert_eq!(write_off_date(d(2024, 3, 1)), Some(d(2024, 4, 1)));
        assert_eq!(write_off_date(d(2024, 3, 31)), Some(d(2024, 4, 1)));
        assert_eq!(write_off_date(d(2024, 12, 31)), Some(d(2025, 1, 1)));
    }

    #[test]
    fn test_count_daily_installments_excludes_stop() {
        // Mon 2024-01-01 .. Mon 2024-01-15 exclusive => two full weeks of weekdays
        let n = count_installments(d(2024, 1, 1), RepaymentSchedule::Daily, d(2024, 1, 15));
        assert_eq!(n, 10);
    }

    #[test]
    fn test_count_weekly_installments() {
        // Wednesdays: 3, 10, 17, 24 (stop on 31st is excluded)
        let n = count_installments(d(2024, 1, 3), RepaymentSchedule::Weekly, d(2024, 1, 31));
        assert_eq!(n, 4);
    }

    #[test]
    fn test_stop_before_start_counts_nothing() {
        let n = count_installments(d(2024, 2, 1), RepaymentSchedule::Daily, d(2024, 1, 1));
        assert_eq!(n, 0);
    }

    #[test]
    fn test_max_installments_floor() {
        assert_eq!(max_installments(dec!(5000000), dec!(133000)), 50);
        assert_eq!(max_installments(dec!(5000000), dec!(140000)), 47);
        assert_eq!(max_installments(dec!(5000000), dec!(0)), 0);
    }

    #[test]
    fn test_outstanding_after_ten_installments() {
        let out = write_off_outstanding(
            d(2024, 1, 1),
            RepaymentSchedule::Daily,
            d(2024, 1, 15),
            dec!(133000),
            dec!(5000000),
        );
        assert_eq!(out, dec!(5000000) - dec!(1330000));
    }

    #[test]
    fn test_outstanding_never_negative() {
        // 60 weekdays would be paid, capped at 50 installments = 6.65M > 5M
        let out = write_off_outstanding(
            d(2024, 1, 1),
            RepaymentSchedule::Daily,
            d(2024, 4, 1),
            dec!(133000),
            dec!(5000000),
        );
        assert_eq!(out, Decimal::ZERO);
    }

    #[test]
    fn test_derive_requires_stop_date() {
        let mut loan = LoanInput {
            borrower_id: "B1".into(),
            schedule: RepaymentSchedule::Weekly,
            start_date: d(2024, 1, 3),
            installment_amount: dec!(133000),
            principal: dec!(5000000),
            stop_date: None,
        };
        assert!(derive_write_off(&loan).is_none());

        loan.stop_date = Some(d(2024, 1, 31));
        let wo = derive_write_off(&loan).unwrap();
        assert_eq!(wo.write_off_date, d(2024, 2, 1));
        assert_eq!(wo.outstanding, dec!(5000000) - dec!(4) * dec!(133000));
    }
}
