use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{LedgerError, Result};

/// lifecycle status of one quota record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    /// generated, not yet due or not yet assessed
    Pending,
    /// fully settled; terminal
    Paid,
    /// past due with an accrued late fee
    Overdue,
    /// partially covered, or an advance whose covered range is partly reached
    PartiallyPaid,
    /// settled together with a range of future quota numbers
    AdvancePaid,
}

impl QuotaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaStatus::Pending => "pending",
            QuotaStatus::Paid => "paid",
            QuotaStatus::Overdue => "overdue",
            QuotaStatus::PartiallyPaid => "partially_paid",
            QuotaStatus::AdvancePaid => "advance_paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuotaStatus::Paid)
    }

    /// own amount fully allocated
    pub fn is_settled(&self) -> bool {
        matches!(self, QuotaStatus::Paid | QuotaStatus::AdvancePaid)
    }

    /// still owes money on its own amount
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            QuotaStatus::Pending | QuotaStatus::Overdue | QuotaStatus::PartiallyPaid
        )
    }

    /// eligible for the overdue pass
    pub fn is_overdue_candidate(&self) -> bool {
        matches!(self, QuotaStatus::Pending | QuotaStatus::Overdue)
    }

    pub fn can_transition_to(&self, next: QuotaStatus) -> bool {
        use QuotaStatus::*;

        match (self, next) {
            (Pending, Paid | PartiallyPaid | AdvancePaid | Overdue) => true,
            // overdue recompute rewrites the same status
            (Overdue, Paid | PartiallyPaid | AdvancePaid | Overdue) => true,
            // a top-up settles the quota; a large one overpays into an advance
            (PartiallyPaid, Paid | PartiallyPaid | AdvancePaid) => true,
            (AdvancePaid, PartiallyPaid | Paid) => true,
            _ => false,
        }
    }

    /// validate a move to `next`
    pub fn transition(self, next: QuotaStatus) -> Result<QuotaStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LedgerError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
