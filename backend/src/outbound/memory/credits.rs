//! In-memory store credit ledger with the grant-once flag.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::ids::{DisplayId, StoreId};
use crate::domain::ledger::{CreditTransactionKind, StoreCreditTransaction};
use crate::domain::ports::{CreditLedger, LedgerError};

#[derive(Default)]
struct Inner {
    balances: HashMap<StoreId, i64>,
    granted: HashSet<StoreId>,
    log: Vec<StoreCreditTransaction>,
}

/// Mutex-backed credit balances, grant flags, and the transaction log.
///
/// Balance mutation, the grant flag, and the log row move under one lock so
/// concurrent activation retries cannot double-grant.
#[derive(Default)]
pub struct InMemoryCredits {
    inner: Mutex<Inner>,
}

impl InMemoryCredits {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::connection("credit lock poisoned"))
    }
}

#[async_trait]
impl CreditLedger for InMemoryCredits {
    async fn grant_setup_credit(
        &self,
        store: &StoreId,
        amount: i64,
        related_display: &DisplayId,
    ) -> Result<Option<StoreCreditTransaction>, LedgerError> {
        let mut guard = self.lock()?;
        if !guard.granted.insert(store.clone()) {
            return Ok(None);
        }
        let balance = guard.balances.entry(store.clone()).or_default();
        *balance += amount;
        let transaction = StoreCreditTransaction {
            id: Uuid::new_v4(),
            store: store.clone(),
            amount,
            kind: CreditTransactionKind::Earned,
            reason: "setup photo credit".to_owned(),
            related_display: Some(related_display.clone()),
            balance_after: *balance,
            recorded_at: Utc::now(),
        };
        guard.log.push(transaction.clone());
        Ok(Some(transaction))
    }

    async fn balance(&self, store: &StoreId) -> Result<i64, LedgerError> {
        let guard = self.lock()?;
        Ok(guard.balances.get(store).copied().unwrap_or(0))
    }

    async fn transactions(
        &self,
        store: &StoreId,
    ) -> Result<Vec<StoreCreditTransaction>, LedgerError> {
        let guard = self.lock()?;
        Ok(guard
            .log
            .iter()
            .filter(|tx| &tx.store == store)
            .cloned()
            .collect())
    }
}
