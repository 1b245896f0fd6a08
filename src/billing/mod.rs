//! Billing cycle orchestration: the scheduled generation and overdue passes,
//! real payments, and administrative status changes, run against a
//! [`LedgerRepository`].
//!
//! Every read-compute-write on one financing runs under that financing's lock.
//! Financing writes carry the version that was read; a stale version is
//! retried once with a fresh read before surfacing [`LedgerError::Conflict`].

pub mod generation;
pub mod locks;
pub mod overdue;
pub mod payment;
pub mod report;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::config::{BillingConfig, ConfigSource};
use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::financing::{Financing, FinancingUpdate};
use crate::store::LedgerRepository;
use crate::types::{FinancingId, FinancingStatus};

pub use locks::FinancingLocks;
pub use report::{GenerationOutcome, GenerationReport, ItemFailure, OverdueReport};

/// orchestrator over a ledger store and a settings source
pub struct BillingCycle<R: LedgerRepository> {
    repo: R,
    settings: Box<dyn ConfigSource + Send + Sync>,
    locks: FinancingLocks,
}

impl<R: LedgerRepository> BillingCycle<R> {
    /// orchestrator using the default billing settings
    pub fn new(repo: R) -> Self {
        Self::with_settings(repo, BillingConfig::default())
    }

    pub fn with_settings(repo: R, settings: impl ConfigSource + Send + Sync + 'static) -> Self {
        Self {
            repo,
            settings: Box::new(settings),
            locks: FinancingLocks::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// resolve billing settings; called once per pass or payment
    pub fn load_config(&self) -> Result<BillingConfig> {
        BillingConfig::load(self.settings.as_ref())
    }

    /// change a financing's status on an administrator's behalf
    pub fn override_status(
        &self,
        id: FinancingId,
        status: FinancingStatus,
        reason: &str,
    ) -> Result<(Financing, Vec<LedgerEvent>)> {
        self.locks.with_lock(id, || {
            let mut previous = None;
            let updated = self.update_financing_with_retry(id, |financing| {
                if financing.status == status {
                    return Ok(None);
                }
                financing.validate_status_override(status)?;
                previous = Some(financing.status);
                Ok(Some(FinancingUpdate {
                    status: Some(status),
                    ..Default::default()
                }))
            })?;

            let mut events = Vec::new();
            if let Some(old_status) = previous {
                info!(
                    financing_id = %id,
                    old_status = ?old_status,
                    new_status = ?status,
                    reason,
                    "financing status overridden"
                );
                events.push(LedgerEvent::StatusChanged {
                    financing_id: id,
                    old_status,
                    new_status: status,
                    reason: reason.to_string(),
                });
            }
            Ok((updated, events))
        })
    }

    fn fetch_financing(&self, id: FinancingId) -> Result<Financing> {
        self.repo
            .get_financing(id)?
            .ok_or(LedgerError::FinancingNotFound { id })
    }

    /// read-compute-write on a financing's aggregates
    ///
    /// `compute` sees a fresh copy on every attempt and returns `None` when
    /// nothing needs writing. The write is conditional on the version read.
    fn update_financing_with_retry<F>(&self, id: FinancingId, mut compute: F) -> Result<Financing>
    where
        F: FnMut(&Financing) -> Result<Option<FinancingUpdate>>,
    {
        for attempt in 0..2 {
            let financing = self.fetch_financing(id)?;
            let Some(mut update) = compute(&financing)? else {
                return Ok(financing);
            };
            update.expected_version = Some(financing.version);

            match self.repo.update_financing(id, update) {
                Err(e) if e.is_conflict() && attempt == 0 => {
                    debug!(financing_id = %id, "stale financing version, retrying");
                }
                other => return other,
            }
        }
        Err(LedgerError::Conflict { id })
    }
}

/// calendar date of the provider's current instant
pub(crate) fn today(time: &SafeTimeProvider) -> NaiveDate {
    time.now().date_naive()
}
