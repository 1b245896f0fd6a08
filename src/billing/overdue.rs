use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::ledger::{enter_overdue, OverdueEntry, QuotaStatus};
use crate::store::LedgerRepository;
use crate::types::FinancingId;

use super::report::{ItemFailure, OverdueReport};
use super::{today, BillingCycle};

/// a quota the overdue pass wrote
#[derive(Debug, Clone, PartialEq)]
pub struct OverdueMark {
    pub quota_number: u32,
    pub previous_status: QuotaStatus,
    pub entry: OverdueEntry,
}

impl OverdueMark {
    pub fn is_new(&self) -> bool {
        self.previous_status != QuotaStatus::Overdue
    }
}

impl<R: LedgerRepository> BillingCycle<R> {
    /// mark past-due pending/overdue quotas and recompute their late fees
    ///
    /// Walks every financing that still accepts payments, delinquent ones
    /// included. Fees are recomputed from each quota's due date, so re-running on the
    /// same reference date writes identical values. Financing aggregates are
    /// not touched; they only move when a payment arrives.
    pub fn run_overdue_pass(&self, reference_date: NaiveDate) -> Result<OverdueReport> {
        let config = self.load_config()?;
        let financings: Vec<_> = self
            .repo
            .list_financings(None)?
            .into_iter()
            .filter(|f| f.status.accepts_payments())
            .collect();
        info!(%reference_date, financings = financings.len(), "overdue pass started");

        let mut report = OverdueReport::new(reference_date);
        let mut events = EventStore::new();

        for financing in &financings {
            let candidates: Vec<u32> = match self.repo.list_quotas(financing.id, None) {
                Ok(records) => records
                    .iter()
                    .filter(|r| r.status.is_overdue_candidate() && r.due_date <= reference_date)
                    .map(|r| r.quota_number)
                    .collect(),
                Err(e) => {
                    warn!(financing_id = %financing.id, error = %e, "quota listing failed");
                    report.record_failure(ItemFailure::new(financing.id, None, &e));
                    continue;
                }
            };

            for quota_number in candidates {
                match self.mark_overdue(financing.id, quota_number, reference_date, &config) {
                    Ok(Some(mark)) => {
                        if mark.is_new() {
                            report.newly_overdue += 1;
                        } else {
                            report.recomputed += 1;
                        }
                        report.total_fees += mark.entry.assessment.fee;
                        events.emit(LedgerEvent::QuotaOverdue {
                            financing_id: financing.id,
                            quota_number,
                            days_late: mark.entry.assessment.days_late,
                            late_fee: mark.entry.assessment.fee,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(financing_id = %financing.id, quota_number, error = %e, "overdue update failed");
                        report.record_failure(ItemFailure::new(financing.id, Some(quota_number), &e));
                    }
                }
            }
        }

        report.events = events.take_events();
        info!(
            %reference_date,
            newly_overdue = report.newly_overdue,
            recomputed = report.recomputed,
            total_fees = %report.total_fees,
            failed = report.failed,
            "overdue pass finished"
        );
        Ok(report)
    }

    pub fn run_overdue_pass_at(&self, time: &SafeTimeProvider) -> Result<OverdueReport> {
        self.run_overdue_pass(today(time))
    }

    /// re-read one quota under the financing lock and move it to overdue
    ///
    /// Returns `None` when the quota was settled or is not yet due by the
    /// time the lock was taken.
    pub fn mark_overdue(
        &self,
        financing_id: FinancingId,
        quota_number: u32,
        reference_date: NaiveDate,
        config: &BillingConfig,
    ) -> Result<Option<OverdueMark>> {
        self.locks.with_lock(financing_id, || {
            let record = self
                .repo
                .find_quota(financing_id, quota_number)?
                .ok_or(LedgerError::QuotaNotFound {
                    financing_id,
                    quota_number,
                })?;

            let Some(entry) = enter_overdue(&record, reference_date, config)? else {
                return Ok(None);
            };

            let mut current = record.clone();
            entry.update.apply_to(&mut current);
            if current != record {
                self.repo.update_quota(record.id, entry.update.clone())?;
            }

            debug!(
                financing_id = %financing_id,
                quota_number,
                days_late = entry.assessment.days_late,
                late_fee = %entry.assessment.fee,
                "quota overdue"
            );
            Ok(Some(OverdueMark {
                quota_number,
                previous_status: record.status,
                entry,
            }))
        })
    }
}
