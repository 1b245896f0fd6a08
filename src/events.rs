use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::ledger::QuotaStatus;
use crate::types::{FinancingId, FinancingStatus};

/// all events emitted by the billing ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // generation events
    QuotaGenerated {
        financing_id: FinancingId,
        quota_number: u32,
        amount: Money,
        due_date: NaiveDate,
    },
    QuotaCoveredByAdvance {
        financing_id: FinancingId,
        quota_number: u32,
        advance_quota_number: u32,
    },
    AdvanceReconciled {
        financing_id: FinancingId,
        advance_quota_number: u32,
        old_status: QuotaStatus,
        new_status: QuotaStatus,
    },
    CreditApplied {
        financing_id: FinancingId,
        quota_number: u32,
        amount: Money,
        remaining_credit: Money,
    },

    // overdue events
    QuotaOverdue {
        financing_id: FinancingId,
        quota_number: u32,
        days_late: u32,
        late_fee: Money,
    },

    // payment events
    PaymentApplied {
        financing_id: FinancingId,
        quota_number: u32,
        amount: Money,
        fee_collected: Money,
        quotas_settled: u32,
        carried_credit: Money,
        date: NaiveDate,
    },
    QuotaSettled {
        financing_id: FinancingId,
        quota_number: u32,
        status: QuotaStatus,
    },

    // financing events
    FinancingCompleted {
        financing_id: FinancingId,
        total_paid: Money,
        total_late_fees: Money,
    },
    StatusChanged {
        financing_id: FinancingId,
        old_status: FinancingStatus,
        new_status: FinancingStatus,
        reason: String,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LedgerEvent>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
