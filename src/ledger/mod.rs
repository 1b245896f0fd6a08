pub mod quota;
pub mod status;
pub mod transitions;

pub use quota::{CoveredRange, NewQuota, QuotaRecord, QuotaUpdate};
pub use status::QuotaStatus;
pub use transitions::{
    apply_credit, enter_overdue, resolve_materialized, AdvanceResolution, CreditApplication,
    OverdueEntry,
};
