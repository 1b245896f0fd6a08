use thiserror::Error;

use crate::decimal::Money;
use crate::ledger::QuotaStatus;
use crate::types::{FinancingId, FinancingStatus, QuotaId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("unknown payment frequency: {value}")]
    UnknownFrequency {
        value: String,
    },

    #[error("invalid term: {months} months")]
    InvalidTerm {
        months: u32,
    },

    #[error("negative amount for {field}: {amount}")]
    NegativeAmount {
        field: &'static str,
        amount: Money,
    },

    #[error("due date of quota {quota_number} is out of the calendar range")]
    DueDateOutOfRange {
        quota_number: u32,
    },

    #[error("invalid quota number: {quota_number}")]
    InvalidQuotaNumber {
        quota_number: u32,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid quota transition: {from} -> {to}")]
    InvalidTransition {
        from: QuotaStatus,
        to: QuotaStatus,
    },

    #[error("invalid status override to {requested:?}: {message}")]
    InvalidStatusOverride {
        requested: FinancingStatus,
        message: String,
    },

    #[error("financing not found: {id}")]
    FinancingNotFound {
        id: FinancingId,
    },

    #[error("quota {quota_number} not found for financing {financing_id}")]
    QuotaNotFound {
        financing_id: FinancingId,
        quota_number: u32,
    },

    #[error("quota record not found: {id}")]
    QuotaRecordNotFound {
        id: QuotaId,
    },

    #[error("quota {quota_number} already exists for financing {financing_id}")]
    DuplicateQuota {
        financing_id: FinancingId,
        quota_number: u32,
    },

    #[error("quota {quota_number} already settled: status is {status}")]
    QuotaAlreadySettled {
        quota_number: u32,
        status: QuotaStatus,
    },

    #[error("financing not accepting payments: current status is {status:?}")]
    FinancingNotPayable {
        status: FinancingStatus,
    },

    #[error("concurrent update conflict on financing {id}")]
    Conflict {
        id: FinancingId,
    },

    #[error("store unavailable: {message}")]
    StoreUnavailable {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
