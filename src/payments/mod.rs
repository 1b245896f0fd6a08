pub mod allocation;
pub mod plan;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::events::LedgerEvent;
use crate::ledger::{CoveredRange, QuotaStatus};
use crate::types::FinancingId;

pub use allocation::{allocate, Allocation};
pub use plan::{plan_payment, AmountDue, PaymentPlan, QuotaSettlement};

/// payment received against one quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub financing_id: FinancingId,
    pub quota_number: u32,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub reference: String,
}

/// what a payment did once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub financing_id: FinancingId,
    pub quota_number: u32,
    pub quota_status: QuotaStatus,
    pub amount: Money,
    pub quotas_settled: u32,
    pub fee_collected: Money,
    pub carried_credit: Money,
    pub advance: Option<CoveredRange>,
    pub paid_quotas: u32,
    pub current_balance: Money,
    pub completed: bool,
    pub events: Vec<LedgerEvent>,
}
