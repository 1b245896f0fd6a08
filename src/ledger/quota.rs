use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::ledger::QuotaStatus;
use crate::types::{FinancingId, QuotaId};

/// future quota numbers settled ahead of time by an advance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredRange {
    pub first: u32,
    pub last: u32,
}

impl CoveredRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, quota_number: u32) -> bool {
        (self.first..=self.last).contains(&quota_number)
    }

    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

/// one billing period of a financing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub id: QuotaId,
    pub financing_id: FinancingId,
    /// 1-based, unique per financing
    pub quota_number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: QuotaStatus,

    // late fees
    pub late_fee: Money,
    pub late_fee_paid: Money,
    pub days_late: u32,

    // partial / advance tracking
    /// quota numbers settled by this record, itself included
    pub quotas_covered: u32,
    pub covers: Option<CoveredRange>,
    /// face amount still unpaid
    pub remaining_balance: Money,
    /// credit left over by the payment that settled this record
    pub carried_credit: Money,
    pub paid_date: Option<NaiveDate>,
}

impl QuotaRecord {
    /// late fee accrued but not yet collected
    pub fn outstanding_fee(&self) -> Money {
        self.late_fee.saturating_sub(self.late_fee_paid)
    }

    /// face remaining plus uncollected fee
    pub fn amount_due(&self) -> Money {
        self.remaining_balance + self.outstanding_fee()
    }

    /// own amount fully allocated, including advances whose range is partly reached
    pub fn is_self_settled(&self) -> bool {
        self.status.is_settled() || self.covers.is_some()
    }

    /// true if `quota_number` is settled by this record's advance range
    pub fn covers_quota(&self, quota_number: u32) -> bool {
        self.covers.map_or(false, |range| range.contains(quota_number))
    }

    /// highest quota number this record accounts for
    pub fn last_covered_number(&self) -> u32 {
        self.covers.map_or(self.quota_number, |range| range.last)
    }
}

/// fields for a freshly generated quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuota {
    pub quota_number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
}

impl NewQuota {
    /// materialize as a pending record
    pub fn into_record(self, id: QuotaId, financing_id: FinancingId) -> QuotaRecord {
        QuotaRecord {
            id,
            financing_id,
            quota_number: self.quota_number,
            amount: self.amount,
            due_date: self.due_date,
            status: QuotaStatus::Pending,
            late_fee: Money::ZERO,
            late_fee_paid: Money::ZERO,
            days_late: 0,
            quotas_covered: 1,
            covers: None,
            remaining_balance: self.amount,
            carried_credit: Money::ZERO,
            paid_date: None,
        }
    }
}

/// partial update of a quota record; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaUpdate {
    pub status: Option<QuotaStatus>,
    pub late_fee: Option<Money>,
    pub late_fee_paid: Option<Money>,
    pub days_late: Option<u32>,
    pub quotas_covered: Option<u32>,
    pub covers: Option<CoveredRange>,
    pub remaining_balance: Option<Money>,
    pub carried_credit: Option<Money>,
    pub paid_date: Option<NaiveDate>,
}

impl QuotaUpdate {
    pub fn status(status: QuotaStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == QuotaUpdate::default()
    }

    /// apply onto a record in place
    pub fn apply_to(&self, record: &mut QuotaRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(fee) = self.late_fee {
            record.late_fee = fee;
        }
        if let Some(paid) = self.late_fee_paid {
            record.late_fee_paid = paid;
        }
        if let Some(days) = self.days_late {
            record.days_late = days;
        }
        if let Some(covered) = self.quotas_covered {
            record.quotas_covered = covered;
        }
        if let Some(range) = self.covers {
            record.covers = Some(range);
        }
        if let Some(remaining) = self.remaining_balance {
            record.remaining_balance = remaining;
        }
        if let Some(credit) = self.carried_credit {
            record.carried_credit = credit;
        }
        if let Some(date) = self.paid_date {
            record.paid_date = Some(date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn pending(amount: i64) -> QuotaRecord {
        NewQuota {
            quota_number: 3,
            amount: Money::from_major(amount),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
        .into_record(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_new_record_is_pending_with_full_balance() {
        let record = pending(200);
        assert_eq!(record.status, QuotaStatus::Pending);
        assert_eq!(record.remaining_balance, Money::from_major(200));
        assert_eq!(record.quotas_covered, 1);
        assert_eq!(record.amount_due(), Money::from_major(200));
        assert_eq!(record.last_covered_number(), 3);
    }

    #[test]
    fn test_amount_due_includes_uncollected_fee() {
        let mut record = pending(200);
        record.late_fee = Money::from_major(30);
        record.late_fee_paid = Money::from_major(10);
        record.remaining_balance = Money::from_major(150);

        assert_eq!(record.outstanding_fee(), Money::from_major(20));
        assert_eq!(record.amount_due(), Money::from_major(170));
    }

    #[test]
    fn test_covered_range() {
        let mut record = pending(200);
        record.covers = Some(CoveredRange::new(4, 6));

        assert!(!record.covers_quota(3));
        assert!(record.covers_quota(4));
        assert!(record.covers_quota(6));
        assert!(!record.covers_quota(7));
        assert_eq!(record.last_covered_number(), 6);
        assert_eq!(CoveredRange::new(4, 6).len(), 3);
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut record = pending(200);
        let update = QuotaUpdate {
            status: Some(QuotaStatus::Overdue),
            days_late: Some(2),
            ..Default::default()
        };
        update.apply_to(&mut record);

        assert_eq!(record.status, QuotaStatus::Overdue);
        assert_eq!(record.days_late, 2);
        assert_eq!(record.remaining_balance, Money::from_major(200));
        assert!(QuotaUpdate::default().is_empty());
        assert!(!update.is_empty());
    }
}
