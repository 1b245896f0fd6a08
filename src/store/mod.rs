pub mod memory;

use crate::errors::Result;
use crate::financing::{Financing, FinancingUpdate};
use crate::ledger::{NewQuota, QuotaRecord, QuotaStatus, QuotaUpdate};
use crate::types::{FinancingId, FinancingStatus, QuotaId};

pub use memory::InMemoryLedgerStore;

/// persistence collaborator for financings and their quota records
///
/// Implementations enforce one record per quota number, reject writes to
/// paid records, and honor `FinancingUpdate::expected_version` by failing
/// with `LedgerError::Conflict` on a mismatch.
pub trait LedgerRepository: Send + Sync {
    fn insert_financing(&self, financing: Financing) -> Result<Financing>;

    fn get_financing(&self, id: FinancingId) -> Result<Option<Financing>>;

    /// every financing, or only those in `status`
    fn list_financings(&self, status: Option<FinancingStatus>) -> Result<Vec<Financing>>;

    fn list_active_financings(&self) -> Result<Vec<Financing>> {
        self.list_financings(Some(FinancingStatus::Active))
    }

    fn update_financing(&self, id: FinancingId, update: FinancingUpdate) -> Result<Financing>;

    fn find_quota(&self, financing_id: FinancingId, quota_number: u32) -> Result<Option<QuotaRecord>>;

    /// records ordered by quota number
    fn list_quotas(
        &self,
        financing_id: FinancingId,
        status: Option<QuotaStatus>,
    ) -> Result<Vec<QuotaRecord>>;

    fn create_quota(&self, financing_id: FinancingId, fields: NewQuota) -> Result<QuotaRecord>;

    fn update_quota(&self, id: QuotaId, update: QuotaUpdate) -> Result<QuotaRecord>;
}
