use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::PaymentFrequency;

/// average weeks per month used to size weekly schedules
pub const WEEKS_PER_MONTH: Decimal = dec!(4.33);

/// number of quotas for a contract term
pub fn total_quotas(months: u32, frequency: PaymentFrequency) -> Result<u32> {
    if months == 0 {
        return Err(LedgerError::InvalidTerm { months });
    }

    let quotas = match frequency {
        PaymentFrequency::Weekly => {
            let weeks = (Decimal::from(months) * WEEKS_PER_MONTH)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            weeks.to_u32().ok_or(LedgerError::InvalidTerm { months })?
        }
        PaymentFrequency::Biweekly => months
            .checked_mul(2)
            .ok_or(LedgerError::InvalidTerm { months })?,
        PaymentFrequency::Monthly => months,
    };

    Ok(quotas)
}

/// face amount of each quota; zero quotas yields zero
pub fn quota_amount(total_amount: Money, total_quotas: u32) -> Result<Money> {
    if total_amount.is_negative() {
        return Err(LedgerError::NegativeAmount {
            field: "total_amount",
            amount: total_amount,
        });
    }
    if total_quotas == 0 {
        return Ok(Money::ZERO);
    }

    Ok(total_amount / Decimal::from(total_quotas))
}

/// days between consecutive due dates (months are a flat 30 days)
pub fn days_interval(frequency: PaymentFrequency) -> u32 {
    match frequency {
        PaymentFrequency::Weekly => 7,
        PaymentFrequency::Biweekly => 15,
        PaymentFrequency::Monthly => 30,
    }
}

/// due date of the 1-based `quota_index`; quota 1 falls one interval after start
pub fn next_due_date(
    start_date: NaiveDate,
    frequency: PaymentFrequency,
    quota_index: u32,
) -> Result<NaiveDate> {
    let offset = i64::from(quota_index) * i64::from(days_interval(frequency));
    start_date
        .checked_add_signed(Duration::days(offset))
        .ok_or(LedgerError::DueDateOutOfRange {
            quota_number: quota_index,
        })
}

/// derived schedule for a set of contract terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub total_quotas: u32,
    pub quota_amount: Money,
}

impl Schedule {
    pub fn derive(total_amount: Money, months: u32, frequency: PaymentFrequency) -> Result<Self> {
        let total_quotas = total_quotas(months, frequency)?;
        let quota_amount = quota_amount(total_amount, total_quotas)?;
        Ok(Self {
            total_quotas,
            quota_amount,
        })
    }
}
