use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::financing::{Financing, FinancingUpdate};
use crate::ledger::{NewQuota, QuotaRecord, QuotaStatus, QuotaUpdate};
use crate::store::LedgerRepository;
use crate::types::{FinancingId, FinancingStatus, QuotaId};

#[derive(Debug, Default)]
struct QuotaTable {
    records: HashMap<QuotaId, QuotaRecord>,
    /// (financing, quota number) -> record id
    index: BTreeMap<(FinancingId, u32), QuotaId>,
}

/// in-process store backing tests and simulations
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    financings: RwLock<HashMap<FinancingId, Financing>>,
    quotas: RwLock<QuotaTable>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn financing_count(&self) -> usize {
        self.financings.read().len()
    }

    pub fn quota_count(&self) -> usize {
        self.quotas.read().records.len()
    }
}

impl LedgerRepository for InMemoryLedgerStore {
    fn insert_financing(&self, financing: Financing) -> Result<Financing> {
        self.financings.write().insert(financing.id, financing.clone());
        Ok(financing)
    }

    fn get_financing(&self, id: FinancingId) -> Result<Option<Financing>> {
        Ok(self.financings.read().get(&id).cloned())
    }

    fn list_financings(&self, status: Option<FinancingStatus>) -> Result<Vec<Financing>> {
        let mut listed: Vec<Financing> = self
            .financings
            .read()
            .values()
            .filter(|f| status.map_or(true, |s| f.status == s))
            .cloned()
            .collect();
        listed.sort_by_key(|f| (f.start_date, f.id));
        Ok(listed)
    }

    fn update_financing(&self, id: FinancingId, update: FinancingUpdate) -> Result<Financing> {
        let mut financings = self.financings.write();
        let financing = financings
            .get_mut(&id)
            .ok_or(LedgerError::FinancingNotFound { id })?;

        if let Some(expected) = update.expected_version {
            if financing.version != expected {
                return Err(LedgerError::Conflict { id });
            }
        }

        update.apply_to(financing);
        financing.version += 1;
        Ok(financing.clone())
    }

    fn find_quota(&self, financing_id: FinancingId, quota_number: u32) -> Result<Option<QuotaRecord>> {
        let table = self.quotas.read();
        Ok(table
            .index
            .get(&(financing_id, quota_number))
            .and_then(|id| table.records.get(id))
            .cloned())
    }

    fn list_quotas(
        &self,
        financing_id: FinancingId,
        status: Option<QuotaStatus>,
    ) -> Result<Vec<QuotaRecord>> {
        let table = self.quotas.read();
        Ok(table
            .index
            .range((financing_id, 0)..=(financing_id, u32::MAX))
            .filter_map(|(_, id)| table.records.get(id))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    fn create_quota(&self, financing_id: FinancingId, fields: NewQuota) -> Result<QuotaRecord> {
        if !self.financings.read().contains_key(&financing_id) {
            return Err(LedgerError::FinancingNotFound { id: financing_id });
        }

        let mut table = self.quotas.write();
        let key = (financing_id, fields.quota_number);
        if table.index.contains_key(&key) {
            return Err(LedgerError::DuplicateQuota {
                financing_id,
                quota_number: fields.quota_number,
            });
        }

        let record = fields.into_record(Uuid::new_v4(), financing_id);
        table.index.insert(key, record.id);
        table.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_quota(&self, id: QuotaId, update: QuotaUpdate) -> Result<QuotaRecord> {
        let mut table = self.quotas.write();
        let record = table
            .records
            .get_mut(&id)
            .ok_or(LedgerError::QuotaRecordNotFound { id })?;

        if record.status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                from: record.status,
                to: update.status.unwrap_or(record.status),
            });
        }

        update.apply_to(record);
        Ok(record.clone())
    }
}
