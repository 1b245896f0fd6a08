pub mod billing;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod financing;
pub mod late_fee;
pub mod ledger;
pub mod payments;
pub mod schedule;
pub mod store;
pub mod summary;
pub mod types;

// re-export key types
pub use billing::{BillingCycle, FinancingLocks, GenerationReport, ItemFailure, OverdueReport};
pub use config::{BillingConfig, ConfigSource};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{EventStore, LedgerEvent};
pub use financing::{Financing, FinancingTerms, FinancingUpdate};
pub use late_fee::{days_late, late_fee, LateFeeAssessment};
pub use ledger::{CoveredRange, NewQuota, QuotaRecord, QuotaStatus, QuotaUpdate};
pub use payments::{allocate, Allocation, AmountDue, PaymentOutcome, PaymentRequest};
pub use schedule::{days_interval, next_due_date, quota_amount, total_quotas, Schedule};
pub use store::{InMemoryLedgerStore, LedgerRepository};
pub use summary::FinancingSummary;
pub use types::{FinancingId, FinancingStatus, PaymentFrequency, QuotaId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
