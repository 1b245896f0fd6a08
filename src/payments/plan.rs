use chrono::NaiveDate;

use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::financing::{Financing, FinancingUpdate};
use crate::late_fee::LateFeeAssessment;
use crate::ledger::{CoveredRange, QuotaRecord, QuotaStatus, QuotaUpdate};
use crate::types::QuotaId;

use super::allocation::{allocate, Allocation};
use super::PaymentRequest;

/// what a quota owes on a given date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountDue {
    pub days_late: u32,
    /// total fee accrued so far, never below what was already recorded
    pub late_fee: Money,
    pub outstanding_fee: Money,
    /// face remaining plus outstanding fee
    pub required: Money,
}

impl AmountDue {
    pub fn at(record: &QuotaRecord, date: NaiveDate, config: &BillingConfig) -> Self {
        let assessment = LateFeeAssessment::assess(
            record.remaining_balance,
            record.due_date,
            date,
            record.status == QuotaStatus::Overdue,
            config.late_fee_rate,
            config.minimum_overdue_days,
        );

        let late_fee = assessment.fee.max(record.late_fee);
        let outstanding_fee = late_fee.saturating_sub(record.late_fee_paid);

        Self {
            days_late: assessment.days_late.max(record.days_late),
            late_fee,
            outstanding_fee,
            required: record.remaining_balance + outstanding_fee,
        }
    }
}

/// planned write for one quota record
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSettlement {
    pub id: QuotaId,
    pub quota_number: u32,
    pub status: QuotaStatus,
    pub update: QuotaUpdate,
    pub fee_collected: Money,
}

/// every write a payment produces, computed without touching the store
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlan {
    pub target: QuotaSettlement,
    /// later materialized quotas settled by the surplus
    pub additional: Vec<QuotaSettlement>,
    /// future quota numbers settled ahead of generation
    pub advance: Option<CoveredRange>,
    pub allocation: Allocation,
    pub quotas_settled: u32,
    pub fee_collected: Money,
    pub carried_credit: Money,
    pub financing_update: FinancingUpdate,
}

impl PaymentPlan {
    pub fn completes_financing(&self) -> bool {
        self.financing_update
            .current_balance
            .map_or(false, |balance| balance.is_settled())
    }
}

/// plan a payment against one quota of `financing`
///
/// `records` holds every quota record of the financing. Outstanding late fees
/// are collected before face amounts. A surplus first settles later open
/// quotas in order, then covers future quota numbers as an advance; anything
/// left becomes carried credit.
pub fn plan_payment(
    financing: &Financing,
    records: &[QuotaRecord],
    request: &PaymentRequest,
    config: &BillingConfig,
) -> Result<PaymentPlan> {
    if !request.amount.is_positive() {
        return Err(LedgerError::InvalidPaymentAmount {
            amount: request.amount,
        });
    }
    if !financing.status.accepts_payments() {
        return Err(LedgerError::FinancingNotPayable {
            status: financing.status,
        });
    }

    let target = records
        .iter()
        .find(|r| r.quota_number == request.quota_number)
        .ok_or(LedgerError::QuotaNotFound {
            financing_id: financing.id,
            quota_number: request.quota_number,
        })?;
    if target.is_self_settled() {
        return Err(LedgerError::QuotaAlreadySettled {
            quota_number: target.quota_number,
            status: target.status,
        });
    }

    let date = request.payment_date;
    let due = AmountDue::at(target, date, config);
    let allocation = allocate(request.amount, due.required, financing.carried_credit)?;
    let pool = request.amount + financing.carried_credit;

    if allocation.quotas_covered == 0 {
        return plan_partial(financing, target, request, due, allocation, pool);
    }

    let mut fee_collected = due.outstanding_fee;
    let mut leftover = pool - due.required;
    let mut quotas_settled = 1;
    let mut additional = Vec::new();
    let mut blocked = false;

    let mut later: Vec<&QuotaRecord> = records
        .iter()
        .filter(|r| r.quota_number > target.quota_number && !r.is_self_settled())
        .collect();
    later.sort_by_key(|r| r.quota_number);

    for record in later {
        let record_due = AmountDue::at(record, date, config);
        if leftover < record_due.required {
            blocked = true;
            break;
        }

        leftover -= record_due.required;
        fee_collected += record_due.outstanding_fee;
        quotas_settled += 1;
        additional.push(QuotaSettlement {
            id: record.id,
            quota_number: record.quota_number,
            status: record.status.transition(QuotaStatus::Paid)?,
            update: settled_update(QuotaStatus::Paid, record_due, date),
            fee_collected: record_due.outstanding_fee,
        });
    }

    let mut advance = None;
    if !blocked && leftover.is_positive() {
        let start = records
            .iter()
            .map(QuotaRecord::last_covered_number)
            .max()
            .unwrap_or(0)
            .max(target.quota_number)
            + 1;

        if start <= financing.total_quotas {
            let future = allocate(leftover, financing.regular_quota_amount(), Money::ZERO)?;
            let count = future.quotas_covered.min(financing.total_quotas - start + 1);
            if count > 0 {
                let range = CoveredRange::new(start, start + count - 1);
                let consumed: Money = (range.first..=range.last)
                    .map(|n| financing.billed_amount(n))
                    .sum();
                leftover -= consumed;
                quotas_settled += count;
                advance = Some(range);
            }
        }
    }

    let status = if advance.is_some() {
        QuotaStatus::AdvancePaid
    } else {
        QuotaStatus::Paid
    };
    let status = target.status.transition(status)?;

    let mut update = settled_update(status, due, date);
    update.carried_credit = Some(leftover);
    if let Some(range) = advance {
        update.covers = Some(range);
        update.quotas_covered = Some(1 + range.len());
    }

    let financing_update = financing.payment_update(request.amount, fee_collected, quotas_settled, leftover);

    Ok(PaymentPlan {
        target: QuotaSettlement {
            id: target.id,
            quota_number: target.quota_number,
            status,
            update,
            fee_collected: due.outstanding_fee,
        },
        additional,
        advance,
        allocation,
        quotas_settled,
        fee_collected,
        carried_credit: leftover,
        financing_update,
    })
}

/// pool smaller than the amount due: fee first, remainder against the face
fn plan_partial(
    financing: &Financing,
    target: &QuotaRecord,
    request: &PaymentRequest,
    due: AmountDue,
    allocation: Allocation,
    pool: Money,
) -> Result<PaymentPlan> {
    let status = target.status.transition(QuotaStatus::PartiallyPaid)?;
    let fee_part = pool.min(due.outstanding_fee);
    let face_part = pool - fee_part;

    let update = QuotaUpdate {
        status: Some(status),
        late_fee: Some(due.late_fee),
        late_fee_paid: Some(target.late_fee_paid + fee_part),
        days_late: Some(due.days_late),
        remaining_balance: Some(target.remaining_balance.saturating_sub(face_part)),
        carried_credit: Some(allocation.new_credit),
        ..Default::default()
    };

    Ok(PaymentPlan {
        target: QuotaSettlement {
            id: target.id,
            quota_number: target.quota_number,
            status,
            update,
            fee_collected: fee_part,
        },
        additional: Vec::new(),
        advance: None,
        allocation,
        quotas_settled: 0,
        fee_collected: fee_part,
        carried_credit: Money::ZERO,
        financing_update: financing.payment_update(request.amount, fee_part, 0, Money::ZERO),
    })
}

fn settled_update(status: QuotaStatus, due: AmountDue, date: NaiveDate) -> QuotaUpdate {
    QuotaUpdate {
        status: Some(status),
        late_fee: Some(due.late_fee),
        late_fee_paid: Some(due.late_fee),
        days_late: Some(due.days_late),
        remaining_balance: Some(Money::ZERO),
        paid_date: Some(date),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::financing::FinancingTerms;
    use crate::ledger::NewQuota;
    use crate::types::{FinancingStatus, PaymentFrequency};
    use uuid::Uuid;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn financing(amount: i64, months: u32) -> Financing {
        Financing::originate(
            FinancingTerms {
                vehicle_id: "VIN-9".to_string(),
                client_id: "client-1".to_string(),
                total_amount: Money::from_major(amount),
                term_months: months,
                frequency: PaymentFrequency::Monthly,
            },
            date(1, 1),
        )
        .unwrap()
    }

    fn quota(financing: &Financing, number: u32) -> QuotaRecord {
        NewQuota {
            quota_number: number,
            amount: financing.billed_amount(number),
            due_date: financing.due_date_for(number).unwrap(),
        }
        .into_record(Uuid::new_v4(), financing.id)
    }

    fn request(financing: &Financing, number: u32, amount: i64, paid_on: NaiveDate) -> PaymentRequest {
        PaymentRequest {
            financing_id: financing.id,
            quota_number: number,
            amount: Money::from_major(amount),
            payment_date: paid_on,
            reference: "test".to_string(),
        }
    }

    fn config() -> BillingConfig {
        BillingConfig {
            late_fee_rate: Rate::from_percentage(1),
            minimum_overdue_days: 1,
        }
    }

    #[test]
    fn test_exact_payment_settles_quota() {
        let f = financing(1_200, 12);
        let records = vec![quota(&f, 1)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 100, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.target.status, QuotaStatus::Paid);
        assert_eq!(plan.quotas_settled, 1);
        assert_eq!(plan.carried_credit, Money::ZERO);
        assert_eq!(plan.financing_update.paid_quotas, Some(1));
        assert_eq!(plan.financing_update.current_balance, Some(Money::from_major(1_100)));
        assert_eq!(plan.target.update.paid_date, Some(date(1, 20)));
    }

    #[test]
    fn test_underpayment_leaves_quota_partially_paid() {
        let f = financing(1_200, 12);
        let records = vec![quota(&f, 1)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 40, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.target.status, QuotaStatus::PartiallyPaid);
        assert_eq!(plan.quotas_settled, 0);
        assert_eq!(plan.target.update.remaining_balance, Some(Money::from_major(60)));
        assert_eq!(plan.target.update.carried_credit, Some(Money::from_major(40)));
        assert_eq!(plan.financing_update.paid_quotas, Some(0));
        assert_eq!(plan.financing_update.total_paid, Some(Money::from_major(40)));
    }

    #[test]
    fn test_late_payment_collects_fee_first() {
        let f = financing(1_200, 12);
        let mut overdue = quota(&f, 1);
        overdue.status = QuotaStatus::Overdue;
        let records = vec![overdue];

        // due 2024-01-31, paid five days later: 1% * 5 * 100 = 5
        let plan = plan_payment(&f, &records, &request(&f, 1, 50, date(2, 5)), &config()).unwrap();
        assert_eq!(plan.fee_collected, Money::from_major(5));
        assert_eq!(plan.target.update.late_fee, Some(Money::from_major(5)));
        assert_eq!(plan.target.update.remaining_balance, Some(Money::from_major(55)));
        assert_eq!(plan.financing_update.total_late_fees, Some(Money::from_major(5)));
        assert_eq!(plan.financing_update.total_paid, Some(Money::from_major(45)));

        let full = plan_payment(&f, &records, &request(&f, 1, 105, date(2, 5)), &config()).unwrap();
        assert_eq!(full.target.status, QuotaStatus::Paid);
        assert_eq!(full.target.update.late_fee_paid, Some(Money::from_major(5)));
        assert_eq!(full.financing_update.total_paid, Some(Money::from_major(100)));
    }

    #[test]
    fn test_large_payment_becomes_advance() {
        let f = financing(1_200, 12);
        let records = vec![quota(&f, 1)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 450, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.target.status, QuotaStatus::AdvancePaid);
        assert_eq!(plan.advance, Some(CoveredRange::new(2, 4)));
        assert_eq!(plan.target.update.quotas_covered, Some(4));
        assert_eq!(plan.quotas_settled, 4);
        assert_eq!(plan.carried_credit, Money::from_major(50));
        assert_eq!(plan.financing_update.carried_credit, Some(Money::from_major(50)));
        assert_eq!(plan.financing_update.paid_quotas, Some(4));
    }

    #[test]
    fn test_top_up_on_partial_quota_overpays_into_advance() {
        let f = financing(1_200, 12);
        let mut partial = quota(&f, 1);
        partial.status = QuotaStatus::PartiallyPaid;
        partial.remaining_balance = Money::from_major(60);
        let records = vec![partial];

        // 60 finishes quota 1, 200 covers quotas 2 and 3
        let plan = plan_payment(&f, &records, &request(&f, 1, 260, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.target.status, QuotaStatus::AdvancePaid);
        assert_eq!(plan.advance, Some(CoveredRange::new(2, 3)));
        assert_eq!(plan.quotas_settled, 3);
        assert_eq!(plan.carried_credit, Money::ZERO);
    }

    #[test]
    fn test_surplus_settles_existing_later_quotas_first() {
        let f = financing(1_200, 12);
        let records = vec![quota(&f, 1), quota(&f, 2)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 300, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.additional.len(), 1);
        assert_eq!(plan.additional[0].quota_number, 2);
        assert_eq!(plan.additional[0].status, QuotaStatus::Paid);
        assert_eq!(plan.advance, Some(CoveredRange::new(3, 3)));
        assert_eq!(plan.quotas_settled, 3);
    }

    #[test]
    fn test_carried_credit_joins_the_pool() {
        let mut f = financing(1_200, 12);
        f.carried_credit = Money::from_major(30);
        let records = vec![quota(&f, 1)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 70, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.target.status, QuotaStatus::Paid);
        assert_eq!(plan.carried_credit, Money::ZERO);
        assert_eq!(plan.financing_update.total_paid, Some(Money::from_major(70)));
    }

    #[test]
    fn test_overpayment_beyond_schedule_kept_as_credit() {
        let f = financing(300, 3);
        let records = vec![quota(&f, 1)];

        let plan = plan_payment(&f, &records, &request(&f, 1, 500, date(1, 20)), &config()).unwrap();

        assert_eq!(plan.advance, Some(CoveredRange::new(2, 3)));
        assert_eq!(plan.carried_credit, Money::from_major(200));
        assert_eq!(plan.financing_update.paid_quotas, Some(3));
        assert_eq!(plan.financing_update.status, Some(FinancingStatus::Completed));
        assert!(plan.completes_financing());
    }

    #[test]
    fn test_rejections() {
        let f = financing(1_200, 12);
        let mut paid = quota(&f, 1);
        paid.status = QuotaStatus::Paid;
        let records = vec![paid];

        assert!(matches!(
            plan_payment(&f, &records, &request(&f, 1, 100, date(1, 20)), &config()),
            Err(LedgerError::QuotaAlreadySettled { .. })
        ));
        assert!(matches!(
            plan_payment(&f, &records, &request(&f, 2, 100, date(1, 20)), &config()),
            Err(LedgerError::QuotaNotFound { .. })
        ));
        assert!(matches!(
            plan_payment(&f, &records, &request(&f, 1, 0, date(1, 20)), &config()),
            Err(LedgerError::InvalidPaymentAmount { .. })
        ));

        let mut closed = f.clone();
        closed.status = FinancingStatus::Inactive;
        assert!(matches!(
            plan_payment(&closed, &[quota(&f, 1)], &request(&f, 1, 100, date(1, 20)), &config()),
            Err(LedgerError::FinancingNotPayable { .. })
        ));
    }
}
