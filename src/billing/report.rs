use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::LedgerError;
use crate::events::LedgerEvent;
use crate::types::FinancingId;

/// one item a batch pass could not process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub financing_id: FinancingId,
    pub quota_number: Option<u32>,
    pub error: String,
}

impl ItemFailure {
    pub fn new(financing_id: FinancingId, quota_number: Option<u32>, error: &LedgerError) -> Self {
        Self {
            financing_id,
            quota_number,
            error: error.to_string(),
        }
    }
}

/// per-financing result of the generation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Created,
    AlreadyExists,
    ScheduleExhausted,
    CoveredByAdvance,
    NotActive,
}

/// result of one generation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub period: u32,
    pub generated: u32,
    pub skipped_existing: u32,
    pub skipped_exhausted: u32,
    pub covered_by_advance: u32,
    pub skipped_inactive: u32,
    pub failed: u32,
    pub failures: Vec<ItemFailure>,
    pub events: Vec<LedgerEvent>,
}

impl GenerationReport {
    pub fn new(period: u32) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: GenerationOutcome) {
        match outcome {
            GenerationOutcome::Created => self.generated += 1,
            GenerationOutcome::AlreadyExists => self.skipped_existing += 1,
            GenerationOutcome::ScheduleExhausted => self.skipped_exhausted += 1,
            GenerationOutcome::CoveredByAdvance => self.covered_by_advance += 1,
            GenerationOutcome::NotActive => self.skipped_inactive += 1,
        }
    }

    pub fn record_failure(&mut self, failure: ItemFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn succeeded(&self) -> u32 {
        self.generated
            + self.skipped_existing
            + self.skipped_exhausted
            + self.covered_by_advance
            + self.skipped_inactive
    }
}

/// result of one overdue pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueReport {
    pub reference_date: NaiveDate,
    /// quotas that moved from pending to overdue
    pub newly_overdue: u32,
    /// quotas already overdue whose fee was recomputed
    pub recomputed: u32,
    /// sum of the fees written during this run
    pub total_fees: Money,
    pub failed: u32,
    pub failures: Vec<ItemFailure>,
    pub events: Vec<LedgerEvent>,
}

impl OverdueReport {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            newly_overdue: 0,
            recomputed: 0,
            total_fees: Money::ZERO,
            failed: 0,
            failures: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, failure: ItemFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn succeeded(&self) -> u32 {
        self.newly_overdue + self.recomputed
    }
}
