//! Calendar-day arithmetic. Dates carry no timezone; every schedule rule is
//! expressed in whole calendar days.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

/// Length of one horizon month in calendar days.
pub const DAYS_PER_HORIZON_MONTH: u64 = 30;

/// Monday to Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True when `date` is the last calendar day of its month.
pub fn is_month_end(date: NaiveDate) -> bool {
    match date.succ_opt() {
        Some(next) => next.month() != date.month(),
        None => true,
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the calendar month after the one containing `date`.
pub fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(1))
}

/// Inclusive end of a simulation that starts on `start` and runs for
/// `months` horizon months of 30 days each.
pub fn horizon_end(start: NaiveDate, months: u32) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(u64::from(months) * DAYS_PER_HORIZON_MONTH))
}

pub fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

/// Every date from `start` to `end`, both inclusive.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekday_detection() {
        // 2024-01-06 is a Saturday
        assert!(!is_weekday(d(2024, 1, 6)));
        assert!(!is_weekday(d(2024, 1, 7)));
        assert!(is_weekday(d(2024, 1, 8)));
        assert!(is_weekday(d(2024, 1, 12)));
    }

    #[test]
    fn test_month_end_including_leap_february() {
        assert!(is_month_end(d(2024, 1, 31)));
        assert!(!is_month_end(d(2024, 2, 28)));
        assert!(is_month_end(d(2024, 2, 29)));
        assert!(is_month_end(d(2023, 2, 28)));
        assert!(is_month_end(d(2024, 4, 30)));
        assert!(!is_month_end(d(2024, 4, 29)));
    }

    #[test]
    fn test_first_of_next_month_rolls_year() {
        assert_eq!(first_of_next_month(d(2024, 12, 15)), Some(d(2025, 1, 1)));
        assert_eq!(first_of_next_month(d(2024, 1, 31)), Some(d(2024, 2, 1)));
        assert_eq!(first_of_next_month(d(2024, 3, 1)), Some(d(2024, 4, 1)));
    }

    #[test]
    fn test_horizon_is_thirty_days_per_month() {
        assert_eq!(horizon_end(d(2024, 1, 1), 1), Some(d(2024, 1, 31)));
        assert_eq!(horizon_end(d(2024, 1, 1), 12), Some(d(2024, 12, 26)));
    }

    #[test]
    fn test_days_inclusive() {
        let days: Vec<_> = days_inclusive(d(2024, 2, 27), d(2024, 3, 1)).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], d(2024, 2, 29));
    }
}
