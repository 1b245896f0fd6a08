use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, error, info};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::financing::Financing;
use crate::ledger::QuotaStatus;
use crate::payments::{plan_payment, AmountDue, PaymentOutcome, PaymentPlan, PaymentRequest, QuotaSettlement};
use crate::store::LedgerRepository;
use crate::types::{FinancingId, FinancingStatus};

use super::{today, BillingCycle};

impl<R: LedgerRepository> BillingCycle<R> {
    /// amount a quota owes on `date`: face remaining plus accrued late fee
    pub fn amount_due(&self, financing_id: FinancingId, quota_number: u32, date: NaiveDate) -> Result<AmountDue> {
        let config = self.load_config()?;
        let record = self
            .repo
            .find_quota(financing_id, quota_number)?
            .ok_or(LedgerError::QuotaNotFound {
                financing_id,
                quota_number,
            })?;
        Ok(AmountDue::at(&record, date, &config))
    }

    /// apply a real payment to one quota
    ///
    /// The financing aggregates are written first, conditional on the version
    /// read; a stale read is planned again once before giving up. Quota
    /// records are written after the aggregates succeed.
    pub fn apply_payment(&self, request: PaymentRequest) -> Result<PaymentOutcome> {
        let config = self.load_config()?;
        let id = request.financing_id;

        self.locks.with_lock(id, || {
            for attempt in 0..2 {
                let financing = self.fetch_financing(id)?;
                let records = self.repo.list_quotas(id, None)?;
                let plan = plan_payment(&financing, &records, &request, &config)?;

                match self.repo.update_financing(id, plan.financing_update.clone()) {
                    Ok(updated) => return self.record_settlements(&request, &financing, plan, updated),
                    Err(e) if e.is_conflict() && attempt == 0 => {
                        debug!(financing_id = %id, "stale financing version, replanning payment");
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(LedgerError::Conflict { id })
        })
    }

    /// pay `amount` against a quota, dated by the time provider
    pub fn apply_payment_at(
        &self,
        financing_id: FinancingId,
        quota_number: u32,
        amount: Money,
        reference: &str,
        time: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        self.apply_payment(PaymentRequest {
            financing_id,
            quota_number,
            amount,
            payment_date: today(time),
            reference: reference.to_string(),
        })
    }

    fn record_settlements(
        &self,
        request: &PaymentRequest,
        before: &Financing,
        plan: PaymentPlan,
        updated: Financing,
    ) -> Result<PaymentOutcome> {
        let id = updated.id;
        let mut events = EventStore::new();

        for settlement in std::iter::once(&plan.target).chain(plan.additional.iter()) {
            self.write_settlement(id, settlement)?;
            if settlement.status != QuotaStatus::PartiallyPaid {
                events.emit(LedgerEvent::QuotaSettled {
                    financing_id: id,
                    quota_number: settlement.quota_number,
                    status: settlement.status,
                });
            }
        }

        info!(
            financing_id = %id,
            quota_number = request.quota_number,
            amount = %request.amount,
            reference = %request.reference,
            quotas_settled = plan.quotas_settled,
            fee_collected = %plan.fee_collected,
            carried_credit = %plan.carried_credit,
            "payment applied"
        );
        events.emit(LedgerEvent::PaymentApplied {
            financing_id: id,
            quota_number: request.quota_number,
            amount: request.amount,
            fee_collected: plan.fee_collected,
            quotas_settled: plan.quotas_settled,
            carried_credit: plan.carried_credit,
            date: request.payment_date,
        });

        let completed = updated.status == FinancingStatus::Completed;
        if completed && before.status != FinancingStatus::Completed {
            info!(financing_id = %id, total_paid = %updated.total_paid, "financing completed");
            events.emit(LedgerEvent::FinancingCompleted {
                financing_id: id,
                total_paid: updated.total_paid,
                total_late_fees: updated.total_late_fees,
            });
        }

        Ok(PaymentOutcome {
            financing_id: id,
            quota_number: request.quota_number,
            quota_status: plan.target.status,
            amount: request.amount,
            quotas_settled: plan.quotas_settled,
            fee_collected: plan.fee_collected,
            carried_credit: plan.carried_credit,
            advance: plan.advance,
            paid_quotas: updated.paid_quotas,
            current_balance: updated.current_balance,
            completed,
            events: events.take_events(),
        })
    }

    fn write_settlement(&self, financing_id: FinancingId, settlement: &QuotaSettlement) -> Result<()> {
        if let Err(e) = self.repo.update_quota(settlement.id, settlement.update.clone()) {
            // aggregates already moved; the record needs manual repair
            error!(
                financing_id = %financing_id,
                quota_number = settlement.quota_number,
                status = %settlement.status,
                error = %e,
                "quota write failed after financing update"
            );
            return Err(e);
        }
        debug!(
            financing_id = %financing_id,
            quota_number = settlement.quota_number,
            status = %settlement.status,
            "quota settled"
        );
        Ok(())
    }
}
