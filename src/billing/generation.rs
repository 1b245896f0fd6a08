use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, error, info, warn};

use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::financing::{Financing, FinancingUpdate};
use crate::ledger::{apply_credit, resolve_materialized, AdvanceResolution, NewQuota, QuotaRecord, QuotaStatus};
use crate::store::LedgerRepository;
use crate::types::{FinancingId, FinancingStatus};

use super::report::{GenerationOutcome, GenerationReport, ItemFailure};
use super::{today, BillingCycle};

/// scheduling cursor after `quota_number` has been materialized
fn cursor_after(financing: &Financing, quota_number: u32) -> Result<Option<NaiveDate>> {
    if quota_number >= financing.total_quotas {
        return Ok(None);
    }
    let next = financing.due_date_for(quota_number + 1)?;
    Ok((next > financing.next_due_date).then_some(next))
}

impl<R: LedgerRepository> BillingCycle<R> {
    /// materialize quota number `period` for every active financing
    ///
    /// Safe to re-run for the same period: existing quota numbers are left
    /// alone, so each financing ends up with at most one record per number.
    /// A failure on one financing is logged and counted, never fatal.
    pub fn run_generation_pass(&self, period: u32, run_date: NaiveDate) -> Result<GenerationReport> {
        if period == 0 {
            return Err(LedgerError::InvalidQuotaNumber { quota_number: period });
        }

        let financings = self.repo.list_active_financings()?;
        info!(period, financings = financings.len(), %run_date, "generation pass started");

        let mut report = GenerationReport::new(period);
        let mut events = EventStore::new();

        for financing in &financings {
            match self.generate_quota(financing.id, period, run_date) {
                Ok((outcome, produced)) => {
                    report.record(outcome);
                    events.extend(produced);
                }
                Err(e) => {
                    warn!(financing_id = %financing.id, period, error = %e, "quota generation failed");
                    report.record_failure(ItemFailure::new(financing.id, Some(period), &e));
                }
            }
        }

        report.events = events.take_events();
        info!(
            period,
            generated = report.generated,
            skipped_existing = report.skipped_existing,
            skipped_exhausted = report.skipped_exhausted,
            covered_by_advance = report.covered_by_advance,
            failed = report.failed,
            "generation pass finished"
        );
        Ok(report)
    }

    pub fn run_generation_pass_at(&self, period: u32, time: &SafeTimeProvider) -> Result<GenerationReport> {
        self.run_generation_pass(period, today(time))
    }

    /// materialize one quota number for one financing
    pub fn generate_quota(
        &self,
        id: FinancingId,
        period: u32,
        run_date: NaiveDate,
    ) -> Result<(GenerationOutcome, Vec<LedgerEvent>)> {
        if period == 0 {
            return Err(LedgerError::InvalidQuotaNumber { quota_number: period });
        }
        self.locks.with_lock(id, || self.generate_locked(id, period, run_date))
    }

    fn generate_locked(
        &self,
        id: FinancingId,
        period: u32,
        run_date: NaiveDate,
    ) -> Result<(GenerationOutcome, Vec<LedgerEvent>)> {
        let financing = self.fetch_financing(id)?;
        let mut events = EventStore::new();

        if financing.status != FinancingStatus::Active {
            debug!(financing_id = %id, status = ?financing.status, "financing not active");
            return Ok((GenerationOutcome::NotActive, Vec::new()));
        }
        if financing.is_schedule_exhausted(period) {
            debug!(financing_id = %id, period, total_quotas = financing.total_quotas, "schedule exhausted");
            return Ok((GenerationOutcome::ScheduleExhausted, Vec::new()));
        }

        if let Some(existing) = self.repo.find_quota(id, period)? {
            debug!(financing_id = %id, quota_number = period, status = %existing.status, "quota already generated");
            // an interrupted earlier run may not have applied held credit
            if existing.status == QuotaStatus::Pending && financing.carried_credit.is_positive() {
                if let Err(e) = self.settle_new_quota(&existing, run_date, &mut events) {
                    warn!(financing_id = %id, quota_number = period, error = %e, "carried credit not applied");
                }
            }
            return Ok((GenerationOutcome::AlreadyExists, events.take_events()));
        }

        let records = self.repo.list_quotas(id, None)?;
        if let Some(resolution) = resolve_materialized(&records, period)? {
            self.reconcile_advance(&financing, period, resolution, &mut events)?;
            return Ok((GenerationOutcome::CoveredByAdvance, events.take_events()));
        }

        let record = self.repo.create_quota(
            id,
            NewQuota {
                quota_number: period,
                amount: financing.billed_amount(period),
                due_date: financing.due_date_for(period)?,
            },
        )?;
        info!(
            financing_id = %id,
            quota_number = period,
            amount = %record.amount,
            due_date = %record.due_date,
            "quota generated"
        );
        events.emit(LedgerEvent::QuotaGenerated {
            financing_id: id,
            quota_number: period,
            amount: record.amount,
            due_date: record.due_date,
        });

        // the record exists now; later steps are retried by the next run
        if let Err(e) = self.settle_new_quota(&record, run_date, &mut events) {
            warn!(financing_id = %id, quota_number = period, error = %e, "post-generation update deferred");
        }

        Ok((GenerationOutcome::Created, events.take_events()))
    }

    /// relabel the advance record covering `period` instead of creating it
    fn reconcile_advance(
        &self,
        financing: &Financing,
        period: u32,
        resolution: AdvanceResolution,
        events: &mut EventStore,
    ) -> Result<()> {
        let id = financing.id;

        if let Some(update) = resolution.update {
            match self.repo.update_quota(resolution.advance_id, update) {
                Ok(_) => {
                    info!(
                        financing_id = %id,
                        advance_quota_number = resolution.advance_quota_number,
                        old_status = %resolution.old_status,
                        new_status = %resolution.new_status,
                        "advance reconciled"
                    );
                    events.emit(LedgerEvent::AdvanceReconciled {
                        financing_id: id,
                        advance_quota_number: resolution.advance_quota_number,
                        old_status: resolution.old_status,
                        new_status: resolution.new_status,
                    });
                }
                Err(e) => {
                    warn!(
                        financing_id = %id,
                        advance_quota_number = resolution.advance_quota_number,
                        error = %e,
                        "advance reconciliation deferred"
                    );
                }
            }
        }

        debug!(
            financing_id = %id,
            quota_number = period,
            advance_quota_number = resolution.advance_quota_number,
            "quota covered by advance"
        );
        events.emit(LedgerEvent::QuotaCoveredByAdvance {
            financing_id: id,
            quota_number: period,
            advance_quota_number: resolution.advance_quota_number,
        });

        self.update_financing_with_retry(id, |current| {
            Ok(cursor_after(current, period)?.map(|next_due_date| FinancingUpdate {
                next_due_date: Some(next_due_date),
                ..Default::default()
            }))
        })?;
        Ok(())
    }

    /// move the cursor past a new quota and spend held credit on it
    fn settle_new_quota(&self, record: &QuotaRecord, run_date: NaiveDate, events: &mut EventStore) -> Result<()> {
        let id = record.financing_id;
        let mut application = None;

        let updated = self.update_financing_with_retry(id, |financing| {
            application = apply_credit(record, financing.carried_credit, run_date)?;

            let mut update = FinancingUpdate {
                next_due_date: cursor_after(financing, record.quota_number)?,
                ..Default::default()
            };
            if let Some(credit) = &application {
                update.carried_credit = Some(financing.carried_credit - credit.applied);
                if credit.settled {
                    update.paid_quotas = Some((financing.paid_quotas + 1).min(financing.total_quotas));
                }
            }
            Ok((update != FinancingUpdate::default()).then_some(update))
        })?;

        let Some(credit) = application else {
            return Ok(());
        };

        if let Err(e) = self.repo.update_quota(record.id, credit.update.clone()) {
            error!(
                financing_id = %id,
                quota_number = record.quota_number,
                applied = %credit.applied,
                error = %e,
                "credit deducted from financing but not recorded on quota"
            );
            return Err(e);
        }

        info!(
            financing_id = %id,
            quota_number = record.quota_number,
            applied = %credit.applied,
            remaining_credit = %updated.carried_credit,
            "carried credit applied"
        );
        events.emit(LedgerEvent::CreditApplied {
            financing_id: id,
            quota_number: record.quota_number,
            amount: credit.applied,
            remaining_credit: updated.carried_credit,
        });
        if credit.settled {
            events.emit(LedgerEvent::QuotaSettled {
                financing_id: id,
                quota_number: record.quota_number,
                status: QuotaStatus::Paid,
            });
        }
        Ok(())
    }
}
