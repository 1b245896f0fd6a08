//! serializable views of a financing and its quota ledger
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::billing::BillingCycle;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::financing::Financing;
use crate::ledger::{QuotaRecord, QuotaStatus};
use crate::store::LedgerRepository;
use crate::types::{FinancingId, FinancingStatus, PaymentFrequency};

/// dashboard view of one financing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingSummary {
    pub id: FinancingId,
    pub vehicle_id: String,
    pub client_id: String,
    pub status: FinancingStatus,
    pub schedule: ScheduleView,
    pub balances: BalanceView,
    pub quotas: QuotaCounts,
    pub next_unpaid: Option<NextQuotaView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub frequency: PaymentFrequency,
    pub term_months: u32,
    pub total_quotas: u32,
    pub quota_amount: Money,
    pub paid_quotas: u32,
    pub remaining_quotas: u32,
    pub start_date: NaiveDate,
    pub next_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    pub total_amount: Money,
    pub current_balance: Money,
    pub total_paid: Money,
    pub total_late_fees: Money,
    pub carried_credit: Money,
    /// fees recorded on quotas and not yet collected
    pub outstanding_late_fees: Money,
}

/// materialized quota records by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounts {
    pub pending: u32,
    pub overdue: u32,
    pub partially_paid: u32,
    pub advance_paid: u32,
    pub paid: u32,
}

impl QuotaCounts {
    pub fn tally(records: &[QuotaRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.status {
                QuotaStatus::Pending => counts.pending += 1,
                QuotaStatus::Overdue => counts.overdue += 1,
                QuotaStatus::PartiallyPaid => counts.partially_paid += 1,
                QuotaStatus::AdvancePaid => counts.advance_paid += 1,
                QuotaStatus::Paid => counts.paid += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.pending + self.overdue + self.partially_paid + self.advance_paid + self.paid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextQuotaView {
    pub quota_number: u32,
    pub due_date: NaiveDate,
    pub status: QuotaStatus,
    /// face remaining plus recorded fee not yet collected
    pub amount_due: Money,
}

impl FinancingSummary {
    pub fn build(financing: &Financing, records: &[QuotaRecord]) -> Self {
        let outstanding_late_fees = records.iter().map(QuotaRecord::outstanding_fee).sum();

        let next_unpaid = records
            .iter()
            .filter(|r| r.status.is_open() && !r.is_self_settled())
            .min_by_key(|r| r.quota_number)
            .map(|r| NextQuotaView {
                quota_number: r.quota_number,
                due_date: r.due_date,
                status: r.status,
                amount_due: r.amount_due(),
            });

        FinancingSummary {
            id: financing.id,
            vehicle_id: financing.vehicle_id.clone(),
            client_id: financing.client_id.clone(),
            status: financing.status,
            schedule: ScheduleView {
                frequency: financing.frequency,
                term_months: financing.term_months,
                total_quotas: financing.total_quotas,
                quota_amount: financing.regular_quota_amount(),
                paid_quotas: financing.paid_quotas,
                remaining_quotas: financing.remaining_quotas(),
                start_date: financing.start_date,
                next_due_date: financing.next_due_date,
            },
            balances: BalanceView {
                total_amount: financing.total_amount,
                current_balance: financing.current_balance,
                total_paid: financing.total_paid,
                total_late_fees: financing.total_late_fees,
                carried_credit: financing.carried_credit,
                outstanding_late_fees,
            },
            quotas: QuotaCounts::tally(records),
            next_unpaid,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<R: LedgerRepository> BillingCycle<R> {
    pub fn summarize(&self, id: FinancingId) -> Result<FinancingSummary> {
        let repo = self.repository();
        let financing = repo
            .get_financing(id)?
            .ok_or(LedgerError::FinancingNotFound { id })?;
        let records = repo.list_quotas(id, None)?;
        Ok(FinancingSummary::build(&financing, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financing::FinancingTerms;
    use crate::ledger::NewQuota;
    use uuid::Uuid;

    fn financing() -> Financing {
        Financing::originate(
            FinancingTerms {
                vehicle_id: "VIN-88".to_string(),
                client_id: "client-88".to_string(),
                total_amount: Money::from_major(1_200),
                term_months: 12,
                frequency: PaymentFrequency::Monthly,
            },
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap()
    }

    fn record(f: &Financing, number: u32, status: QuotaStatus) -> QuotaRecord {
        let mut record = NewQuota {
            quota_number: number,
            amount: f.billed_amount(number),
            due_date: f.due_date_for(number).unwrap(),
        }
        .into_record(Uuid::new_v4(), f.id);
        record.status = status;
        record
    }

    #[test]
    fn test_counts_and_next_unpaid() {
        let f = financing();
        let mut overdue = record(&f, 2, QuotaStatus::Overdue);
        overdue.late_fee = Money::from_major(4);
        let records = vec![
            record(&f, 1, QuotaStatus::Paid),
            overdue,
            record(&f, 3, QuotaStatus::Pending),
        ];

        let summary = FinancingSummary::build(&f, &records);
        assert_eq!(summary.quotas.paid, 1);
        assert_eq!(summary.quotas.overdue, 1);
        assert_eq!(summary.quotas.pending, 1);
        assert_eq!(summary.quotas.total(), 3);
        assert_eq!(summary.balances.outstanding_late_fees, Money::from_major(4));

        let next = summary.next_unpaid.unwrap();
        assert_eq!(next.quota_number, 2);
        assert_eq!(next.amount_due, Money::from_major(104));
    }

    #[test]
    fn test_advance_records_are_not_next_unpaid() {
        let f = financing();
        let mut advance = record(&f, 1, QuotaStatus::PartiallyPaid);
        advance.covers = Some(crate::ledger::CoveredRange::new(2, 3));

        let summary = FinancingSummary::build(&f, &[advance]);
        assert!(summary.next_unpaid.is_none());
        assert_eq!(summary.quotas.partially_paid, 1);
    }

    #[test]
    fn test_json_uses_snake_case_statuses() {
        let f = financing();
        let summary = FinancingSummary::build(&f, &[record(&f, 1, QuotaStatus::Pending)]);

        let json = summary.to_json_pretty().unwrap();
        assert!(json.contains("\"status\": \"active\""));
        assert!(json.contains("\"frequency\": \"monthly\""));

        let back: FinancingSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
