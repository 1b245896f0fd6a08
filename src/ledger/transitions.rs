use chrono::NaiveDate;

use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::late_fee::LateFeeAssessment;
use crate::ledger::{QuotaRecord, QuotaStatus, QuotaUpdate};
use crate::types::QuotaId;

/// overdue entry for one quota at a reference date
#[derive(Debug, Clone, PartialEq)]
pub struct OverdueEntry {
    pub update: QuotaUpdate,
    pub assessment: LateFeeAssessment,
}

/// move a past-due pending/overdue quota into `Overdue`, recomputing its fee
///
/// The fee is derived from the static due date each time, so repeated runs
/// on the same date write the same values.
pub fn enter_overdue(
    record: &QuotaRecord,
    reference_date: NaiveDate,
    config: &BillingConfig,
) -> Result<Option<OverdueEntry>> {
    if !record.status.is_overdue_candidate() || record.due_date > reference_date {
        return Ok(None);
    }

    let status = record.status.transition(QuotaStatus::Overdue)?;
    let assessment = LateFeeAssessment::assess(
        record.remaining_balance,
        record.due_date,
        reference_date,
        true,
        config.late_fee_rate,
        config.minimum_overdue_days,
    );

    Ok(Some(OverdueEntry {
        update: QuotaUpdate {
            status: Some(status),
            late_fee: Some(assessment.fee),
            days_late: Some(assessment.days_late),
            ..Default::default()
        },
        assessment,
    }))
}

/// effect of a quota number being materialized on an advance record
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceResolution {
    pub advance_id: QuotaId,
    pub advance_quota_number: u32,
    pub old_status: QuotaStatus,
    pub new_status: QuotaStatus,
    /// `None` when the record already carries the resolved status
    pub update: Option<QuotaUpdate>,
}

/// find the advance record covering `quota_number`, if any
///
/// Reaching the last covered number relabels the advance `Paid`; reaching an
/// earlier one marks it `PartiallyPaid` until the range is exhausted.
pub fn resolve_materialized(
    records: &[QuotaRecord],
    quota_number: u32,
) -> Result<Option<AdvanceResolution>> {
    let Some(advance) = records.iter().find(|r| r.covers_quota(quota_number)) else {
        return Ok(None);
    };

    let resolved = advance.last_covered_number() == quota_number;
    let target = if resolved {
        QuotaStatus::Paid
    } else {
        QuotaStatus::PartiallyPaid
    };

    let update = if advance.status == target || advance.status.is_terminal() {
        None
    } else {
        Some(QuotaUpdate::status(advance.status.transition(target)?))
    };

    Ok(Some(AdvanceResolution {
        advance_id: advance.id,
        advance_quota_number: advance.quota_number,
        old_status: advance.status,
        new_status: if update.is_some() { target } else { advance.status },
        update,
    }))
}

/// carried credit consumed by a newly materialized quota
#[derive(Debug, Clone, PartialEq)]
pub struct CreditApplication {
    pub update: QuotaUpdate,
    pub applied: Money,
    pub settled: bool,
}

/// reduce a fresh quota's balance by credit held on the financing
pub fn apply_credit(
    record: &QuotaRecord,
    credit: Money,
    date: NaiveDate,
) -> Result<Option<CreditApplication>> {
    if !credit.is_positive() || !record.status.is_open() {
        return Ok(None);
    }

    let applied = credit.min(record.remaining_balance);
    if !applied.is_positive() {
        return Ok(None);
    }

    let remaining = record.remaining_balance - applied;
    let settled = remaining.is_settled();
    let status = if settled {
        QuotaStatus::Paid
    } else {
        QuotaStatus::PartiallyPaid
    };
    let status = record.status.transition(status)?;

    Ok(Some(CreditApplication {
        update: QuotaUpdate {
            status: Some(status),
            remaining_balance: Some(if settled { Money::ZERO } else { remaining }),
            paid_date: settled.then_some(date),
            ..Default::default()
        },
        applied,
        settled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::ledger::{CoveredRange, NewQuota};
    use uuid::Uuid;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(number: u32, amount: i64, due: NaiveDate) -> QuotaRecord {
        NewQuota {
            quota_number: number,
            amount: Money::from_major(amount),
            due_date: due,
        }
        .into_record(Uuid::new_v4(), Uuid::nil())
    }

    fn config() -> BillingConfig {
        BillingConfig {
            late_fee_rate: Rate::from_percentage(10),
            minimum_overdue_days: 1,
        }
    }

    #[test]
    fn test_enter_overdue_sets_fee_and_days() {
        let quota = record(1, 225, date(8));
        let entry = enter_overdue(&quota, date(10), &config()).unwrap().unwrap();

        assert_eq!(entry.update.status, Some(QuotaStatus::Overdue));
        assert_eq!(entry.update.days_late, Some(2));
        assert_eq!(entry.update.late_fee, Some(Money::from_major(45)));
    }

    #[test]
    fn test_not_yet_due_is_untouched() {
        let quota = record(1, 225, date(8));
        assert!(enter_overdue(&quota, date(7), &config()).unwrap().is_none());
    }

    #[test]
    fn test_due_today_counts_one_day() {
        let quota = record(1, 100, date(8));
        let entry = enter_overdue(&quota, date(8), &config()).unwrap().unwrap();
        assert_eq!(entry.assessment.days_late, 1);
        assert_eq!(entry.assessment.fee, Money::from_major(10));
    }

    #[test]
    fn test_overdue_recompute_is_deterministic() {
        let mut quota = record(1, 225, date(8));
        let first = enter_overdue(&quota, date(11), &config()).unwrap().unwrap();
        first.update.apply_to(&mut quota);

        let again = enter_overdue(&quota, date(11), &config()).unwrap().unwrap();
        assert_eq!(again.update, first.update);

        let later = enter_overdue(&quota, date(12), &config()).unwrap().unwrap();
        assert!(later.assessment.fee > first.assessment.fee);
    }

    #[test]
    fn test_settled_quotas_skip_overdue() {
        let mut quota = record(1, 225, date(8));
        quota.status = QuotaStatus::AdvancePaid;
        assert!(enter_overdue(&quota, date(20), &config()).unwrap().is_none());

        quota.status = QuotaStatus::Paid;
        assert!(enter_overdue(&quota, date(20), &config()).unwrap().is_none());
    }

    #[test]
    fn test_materializing_inside_advance_range() {
        let mut advance = record(2, 100, date(15));
        advance.status = QuotaStatus::AdvancePaid;
        advance.covers = Some(CoveredRange::new(3, 5));
        advance.quotas_covered = 4;
        let records = vec![advance.clone()];

        let mid = resolve_materialized(&records, 3).unwrap().unwrap();
        assert_eq!(mid.advance_id, advance.id);
        assert_eq!(mid.new_status, QuotaStatus::PartiallyPaid);
        assert_eq!(mid.update, Some(QuotaUpdate::status(QuotaStatus::PartiallyPaid)));

        let last = resolve_materialized(&records, 5).unwrap().unwrap();
        assert_eq!(last.new_status, QuotaStatus::Paid);

        assert!(resolve_materialized(&records, 6).unwrap().is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut advance = record(2, 100, date(15));
        advance.status = QuotaStatus::PartiallyPaid;
        advance.covers = Some(CoveredRange::new(3, 5));
        let records = vec![advance];

        let again = resolve_materialized(&records, 4).unwrap().unwrap();
        assert_eq!(again.update, None);
        assert_eq!(again.new_status, QuotaStatus::PartiallyPaid);
    }

    #[test]
    fn test_paid_advance_never_reopens() {
        let mut advance = record(2, 100, date(15));
        advance.status = QuotaStatus::Paid;
        advance.covers = Some(CoveredRange::new(3, 5));

        let resolution = resolve_materialized(&[advance], 3).unwrap().unwrap();
        assert_eq!(resolution.update, None);
        assert_eq!(resolution.new_status, QuotaStatus::Paid);
    }

    #[test]
    fn test_credit_partially_covers_new_quota() {
        let quota = record(4, 200, date(29));
        let application = apply_credit(&quota, Money::from_major(125), date(22)).unwrap().unwrap();

        assert_eq!(application.applied, Money::from_major(125));
        assert!(!application.settled);
        assert_eq!(application.update.status, Some(QuotaStatus::PartiallyPaid));
        assert_eq!(application.update.remaining_balance, Some(Money::from_major(75)));
        assert_eq!(application.update.paid_date, None);
    }

    #[test]
    fn test_credit_settles_new_quota() {
        let quota = record(4, 200, date(29));
        let application = apply_credit(&quota, Money::from_major(300), date(22)).unwrap().unwrap();

        assert_eq!(application.applied, Money::from_major(200));
        assert!(application.settled);
        assert_eq!(application.update.status, Some(QuotaStatus::Paid));
        assert_eq!(application.update.paid_date, Some(date(22)));
    }

    #[test]
    fn test_no_credit_no_change() {
        let quota = record(4, 200, date(29));
        assert!(apply_credit(&quota, Money::ZERO, date(22)).unwrap().is_none());
    }
}
