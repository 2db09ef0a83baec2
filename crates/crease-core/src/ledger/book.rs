// Per-user ledger registry.
//
// Each user's ledger sits behind its own mutex, so two requests for the same
// user run one after the other while requests for different users never
// wait on each other. The registry lock is held only long enough to find or
// insert a user's handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::budget::BudgetLedger;

/// Shared handle to one user's ledger.
pub type LedgerHandle = Arc<Mutex<BudgetLedger>>;

/// In-process registry of ledgers keyed by user id.
#[derive(Debug, Default)]
pub struct LedgerBook {
    ledgers: Mutex<HashMap<String, LedgerHandle>>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached handle for a user, if one has been loaded.
    pub fn get(&self, user_id: &str) -> Option<LedgerHandle> {
        self.registry().get(user_id).cloned()
    }

    /// The cached handle for a user, creating it with `init` on first use.
    ///
    /// If two callers race, the first inserted ledger wins and both receive
    /// the same handle.
    pub fn get_or_insert_with(
        &self,
        user_id: &str,
        init: impl FnOnce() -> BudgetLedger,
    ) -> LedgerHandle {
        self.registry()
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Drop a user's cached ledger so the next access reloads it.
    pub fn evict(&self, user_id: &str) -> Option<LedgerHandle> {
        self.registry().remove(user_id)
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, LedgerHandle>> {
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lock a ledger handle.
///
/// A poisoned lock is recovered: ledger transitions either complete or leave
/// the ledger untouched, so the state behind it is still consistent.
pub fn lock(handle: &LedgerHandle) -> MutexGuard<'_, BudgetLedger> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
