use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};

/// whole days elapsed after the due date; zero on or before it
pub fn days_late(due_date: NaiveDate, reference_date: NaiveDate) -> u32 {
    let days = (reference_date - due_date).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// days late once a quota is confirmed overdue, never below `minimum_days`
///
/// A quota counts as overdue when it already carries the overdue status or the
/// reference date is past its due date.
pub fn overdue_days(
    due_date: NaiveDate,
    reference_date: NaiveDate,
    confirmed_overdue: bool,
    minimum_days: u32,
) -> u32 {
    let days = days_late(due_date, reference_date);
    if confirmed_overdue || days > 0 {
        days.max(minimum_days)
    } else {
        0
    }
}

/// flat daily penalty on the unpaid amount, linear in days late
pub fn late_fee(pending_amount: Money, days_late: u32, rate_per_day: Rate) -> Money {
    if !pending_amount.is_positive() || days_late == 0 || rate_per_day.is_zero() {
        return Money::ZERO;
    }

    pending_amount * (rate_per_day.as_decimal() * Decimal::from(days_late))
}

/// late-fee assessment for one quota at a reference date, billed in cents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateFeeAssessment {
    pub days_late: u32,
    pub fee: Money,
    pub pending_base: Money,
}

impl LateFeeAssessment {
    pub fn assess(
        pending_amount: Money,
        due_date: NaiveDate,
        reference_date: NaiveDate,
        confirmed_overdue: bool,
        rate_per_day: Rate,
        minimum_days: u32,
    ) -> Self {
        let days_late = overdue_days(due_date, reference_date, confirmed_overdue, minimum_days);
        Self {
            days_late,
            fee: late_fee(pending_amount, days_late, rate_per_day).to_cents(),
            pending_base: pending_amount,
        }
    }

    pub fn is_late(&self) -> bool {
        self.days_late > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_late() {
        let due = date(2024, 3, 10);
        assert_eq!(days_late(due, date(2024, 3, 8)), 0);
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(due, date(2024, 3, 12)), 2);
        assert_eq!(days_late(due, date(2024, 4, 10)), 31);
    }

    #[test]
    fn test_late_fee_reference_values() {
        let rate = Rate::from_percentage(10);
        assert_eq!(late_fee(Money::from_major(225), 0, rate), Money::ZERO);
        assert_eq!(late_fee(Money::ZERO, 5, rate), Money::ZERO);
        assert_eq!(late_fee(Money::from_major(225), 2, rate), Money::from_major(45));
        assert_eq!(late_fee(Money::from_major(225), 2, Rate::ZERO), Money::ZERO);
        assert_eq!(late_fee(Money::from_major(-5), 2, rate), Money::ZERO);
    }

    #[test]
    fn test_fee_is_linear_in_days() {
        let rate = Rate::from_percentage(2);
        let pending = Money::from_major(500);

        let one_day = late_fee(pending, 1, rate);
        let five_days = late_fee(pending, 5, rate);
        assert_eq!(one_day, Money::from_major(10));
        assert_eq!(five_days, Money::from_major(50));
    }

    #[test]
    fn test_confirmed_overdue_has_minimum_one_day() {
        let due = date(2024, 3, 10);

        assert_eq!(overdue_days(due, due, false, 1), 0);
        assert_eq!(overdue_days(due, due, true, 1), 1);
        assert_eq!(overdue_days(due, date(2024, 3, 9), false, 1), 0);
        assert_eq!(overdue_days(due, date(2024, 3, 13), false, 1), 3);
    }

    #[test]
    fn test_assessment_on_partial_remaining() {
        let due = date(2024, 3, 10);
        let assessment = LateFeeAssessment::assess(
            Money::from_major(100),
            due,
            date(2024, 3, 14),
            true,
            Rate::from_percentage(1),
            1,
        );

        assert!(assessment.is_late());
        assert_eq!(assessment.days_late, 4);
        assert_eq!(assessment.fee, Money::from_major(4));
        assert_eq!(assessment.pending_base, Money::from_major(100));
    }
}
