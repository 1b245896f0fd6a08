use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::schedule::{next_due_date, Schedule};
use crate::types::{FinancingId, FinancingStatus, PaymentFrequency};

/// contract terms captured at signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub vehicle_id: String,
    pub client_id: String,
    pub total_amount: Money,
    pub term_months: u32,
    pub frequency: PaymentFrequency,
}

/// financing contract with its derived schedule and running aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financing {
    // identification
    pub id: FinancingId,
    pub vehicle_id: String,
    pub client_id: String,

    // terms
    pub total_amount: Money,
    pub term_months: u32,
    pub frequency: PaymentFrequency,

    // derived schedule
    pub total_quotas: u32,
    pub quota_amount: Money,

    // progress
    pub paid_quotas: u32,
    pub current_balance: Money,
    pub total_paid: Money,
    pub total_late_fees: Money,
    pub carried_credit: Money,

    // status and scheduling cursor
    pub status: FinancingStatus,
    pub start_date: NaiveDate,
    pub next_due_date: NaiveDate,

    /// bumped by the store on every update
    pub version: u64,
}

impl Financing {
    /// sign a new contract and derive its schedule
    pub fn originate(terms: FinancingTerms, start_date: NaiveDate) -> Result<Self> {
        if terms.total_amount.is_negative() {
            return Err(LedgerError::NegativeAmount {
                field: "total_amount",
                amount: terms.total_amount,
            });
        }

        let schedule = Schedule::derive(terms.total_amount, terms.term_months, terms.frequency)?;
        // every due date of the schedule must fit the calendar
        next_due_date(start_date, terms.frequency, schedule.total_quotas)
            .map_err(|_| LedgerError::InvalidTerm { months: terms.term_months })?;
        let first_due = next_due_date(start_date, terms.frequency, 1)?;

        Ok(Self {
            id: Uuid::new_v4(),
            vehicle_id: terms.vehicle_id,
            client_id: terms.client_id,
            total_amount: terms.total_amount,
            term_months: terms.term_months,
            frequency: terms.frequency,
            total_quotas: schedule.total_quotas,
            quota_amount: schedule.quota_amount,
            paid_quotas: 0,
            current_balance: terms.total_amount,
            total_paid: Money::ZERO,
            total_late_fees: Money::ZERO,
            carried_credit: Money::ZERO,
            status: if terms.total_amount.is_settled() {
                FinancingStatus::Completed
            } else {
                FinancingStatus::Active
            },
            start_date,
            next_due_date: first_due,
            version: 0,
        })
    }

    pub fn due_date_for(&self, quota_number: u32) -> Result<NaiveDate> {
        next_due_date(self.start_date, self.frequency, quota_number)
    }

    /// quota amount as billed, in cents
    pub fn regular_quota_amount(&self) -> Money {
        self.quota_amount.to_cents()
    }

    /// billed amount for one quota; the final quota absorbs cent rounding so
    /// the schedule sums to the contract total
    pub fn billed_amount(&self, quota_number: u32) -> Money {
        let regular = self.regular_quota_amount();
        if quota_number != self.total_quotas || self.total_quotas == 0 {
            return regular;
        }

        let preceding = regular.times(self.total_quotas - 1);
        self.total_amount.saturating_sub(preceding)
    }

    pub fn is_schedule_exhausted(&self, quota_number: u32) -> bool {
        quota_number > self.total_quotas
    }

    pub fn remaining_quotas(&self) -> u32 {
        self.total_quotas.saturating_sub(self.paid_quotas)
    }

    /// balance owed after `total_paid` has been applied, floored at zero
    pub fn balance_for(&self, total_paid: Money) -> Money {
        let balance = self.total_amount.saturating_sub(total_paid);
        if balance.is_settled() {
            Money::ZERO
        } else {
            balance
        }
    }

    /// aggregate changes produced by one payment
    pub fn payment_update(
        &self,
        amount_received: Money,
        fee_collected: Money,
        quotas_settled: u32,
        carried_credit: Money,
    ) -> FinancingUpdate {
        let total_paid = self.total_paid + amount_received - fee_collected;
        let current_balance = self.balance_for(total_paid);
        let status = if current_balance.is_settled() {
            FinancingStatus::Completed
        } else {
            self.status
        };

        FinancingUpdate {
            paid_quotas: Some((self.paid_quotas + quotas_settled).min(self.total_quotas)),
            current_balance: Some(current_balance),
            total_paid: Some(total_paid),
            total_late_fees: Some(self.total_late_fees + fee_collected),
            carried_credit: Some(carried_credit),
            status: Some(status),
            next_due_date: None,
            expected_version: Some(self.version),
        }
    }

    /// check an administrator's status change against the balance invariant
    pub fn validate_status_override(&self, requested: FinancingStatus) -> Result<()> {
        let settled = self.current_balance.is_settled();
        match requested {
            FinancingStatus::Completed if !settled => Err(LedgerError::InvalidStatusOverride {
                requested,
                message: format!("balance of {} still outstanding", self.current_balance),
            }),
            FinancingStatus::Active | FinancingStatus::Inactive | FinancingStatus::Delinquent
                if settled =>
            {
                Err(LedgerError::InvalidStatusOverride {
                    requested,
                    message: "financing is fully paid".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// partial update of a financing; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancingUpdate {
    pub paid_quotas: Option<u32>,
    pub current_balance: Option<Money>,
    pub total_paid: Option<Money>,
    pub total_late_fees: Option<Money>,
    pub carried_credit: Option<Money>,
    pub status: Option<FinancingStatus>,
    pub next_due_date: Option<NaiveDate>,
    /// reject the write unless the stored version still matches
    pub expected_version: Option<u64>,
}

impl FinancingUpdate {
    pub fn apply_to(&self, financing: &mut Financing) {
        if let Some(paid) = self.paid_quotas {
            financing.paid_quotas = paid;
        }
        if let Some(balance) = self.current_balance {
            financing.current_balance = balance;
        }
        if let Some(total) = self.total_paid {
            financing.total_paid = total;
        }
        if let Some(fees) = self.total_late_fees {
            financing.total_late_fees = fees;
        }
        if let Some(credit) = self.carried_credit {
            financing.carried_credit = credit;
        }
        if let Some(status) = self.status {
            financing.status = status;
        }
        if let Some(date) = self.next_due_date {
            financing.next_due_date = date;
        }
    }
}
