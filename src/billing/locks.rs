use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::FinancingId;

/// one mutex per financing, so work on different financings never contends
#[derive(Debug, Default)]
pub struct FinancingLocks {
    locks: Mutex<HashMap<FinancingId, Arc<Mutex<()>>>>,
}

impl FinancingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: FinancingId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// run `f` while holding the financing's lock
    pub fn with_lock<T>(&self, id: FinancingId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock();
            f()
        };
        self.release(id, &lock);
        result
    }

    /// forget the entry once no other caller holds or waits on it
    fn release(&self, id: FinancingId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // one reference in the map, one held by the caller
        if Arc::strong_count(lock) == 2 {
            locks.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
