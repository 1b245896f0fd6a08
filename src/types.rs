use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

/// unique identifier for a financing contract
pub type FinancingId = Uuid;

/// unique identifier for a quota (billing) record
pub type QuotaId = Uuid;

/// how often a quota falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl PaymentFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFrequency::Weekly => "weekly",
            PaymentFrequency::Biweekly => "biweekly",
            PaymentFrequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentFrequency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(PaymentFrequency::Weekly),
            "biweekly" => Ok(PaymentFrequency::Biweekly),
            "monthly" => Ok(PaymentFrequency::Monthly),
            _ => Err(LedgerError::UnknownFrequency {
                value: s.to_string(),
            }),
        }
    }
}

/// financing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingStatus {
    /// contract running, quotas being generated
    Active,
    /// closed by an administrator
    Inactive,
    /// flagged for collection, still accepts payments
    Delinquent,
    /// fully paid off
    Completed,
}

impl FinancingStatus {
    pub fn accepts_payments(&self) -> bool {
        matches!(self, FinancingStatus::Active | FinancingStatus::Delinquent)
    }
}
