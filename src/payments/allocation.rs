use rust_decimal::prelude::ToPrimitive;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// result of spreading a payment over equal quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub quotas_covered: u32,
    pub new_credit: Money,
    /// the payment alone, excluding previously carried credit
    pub total_applied: Money,
}

impl Allocation {
    /// payment plus carried credit that was distributed
    pub fn pool(&self, quota_amount: Money) -> Money {
        quota_amount.times(self.quotas_covered) + self.new_credit
    }
}

/// allocate `payment_amount` plus `carried_credit` over quotas of `quota_amount`
///
/// Whatever does not complete a quota is returned as new credit, so an
/// underpayment becomes a deposit held against the next quota.
pub fn allocate(payment_amount: Money, quota_amount: Money, carried_credit: Money) -> Result<Allocation> {
    if payment_amount.is_negative() {
        return Err(LedgerError::NegativeAmount {
            field: "payment_amount",
            amount: payment_amount,
        });
    }
    if carried_credit.is_negative() {
        return Err(LedgerError::NegativeAmount {
            field: "carried_credit",
            amount: carried_credit,
        });
    }

    let pool = payment_amount + carried_credit;

    let quotas_covered = if quota_amount.is_positive() {
        (pool.as_decimal() / quota_amount.as_decimal())
            .round_dp_with_strategy(0, RoundingStrategy::ToZero)
            .to_u32()
            .unwrap_or(u32::MAX)
    } else {
        0
    };

    let new_credit = pool - quota_amount.times(quotas_covered);

    Ok(Allocation {
        quotas_covered,
        new_credit,
        total_applied: payment_amount,
    })
}
