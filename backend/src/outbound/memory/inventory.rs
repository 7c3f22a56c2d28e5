//! In-memory inventory ledger.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::ids::{Sku, StoreId};
use crate::domain::ledger::{InventoryLevel, InventoryTransaction, InventoryTransactionKind};
use crate::domain::ports::{InventoryRepository, LedgerError};

#[derive(Default)]
struct Inner {
    levels: HashMap<(StoreId, Sku), InventoryLevel>,
    log: Vec<InventoryTransaction>,
}

/// Mutex-backed inventory levels plus their append-only transaction log.
///
/// One mutex covers both so a target application reads, writes, and logs as
/// a single atomic step.
#[derive(Default)]
pub struct InMemoryInventory {
    inner: Mutex<Inner>,
}

impl InMemoryInventory {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::connection("inventory lock poisoned"))
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventory {
    async fn level(
        &self,
        store: &StoreId,
        sku: &Sku,
    ) -> Result<Option<InventoryLevel>, LedgerError> {
        let guard = self.lock()?;
        Ok(guard.levels.get(&(store.clone(), sku.clone())).copied())
    }

    async fn apply_target(
        &self,
        store: &StoreId,
        sku: &Sku,
        target: i64,
        kind: InventoryTransactionKind,
        notes: Option<String>,
    ) -> Result<Option<InventoryTransaction>, LedgerError> {
        let mut guard = self.lock()?;
        let key = (store.clone(), sku.clone());
        let existing = guard.levels.get(&key).copied();
        let delta = target - existing.map_or(0, |level| level.on_hand);
        if existing.is_none() && delta == 0 {
            return Ok(None);
        }

        let mut level = existing.unwrap_or_default();
        level.on_hand = target;
        guard.levels.insert(key, level);

        let transaction = InventoryTransaction {
            id: Uuid::new_v4(),
            store: store.clone(),
            sku: sku.clone(),
            kind,
            delta,
            balance_after: target,
            recorded_at: Utc::now(),
            notes,
        };
        guard.log.push(transaction.clone());
        Ok(Some(transaction))
    }

    async fn transactions(
        &self,
        store: &StoreId,
    ) -> Result<Vec<InventoryTransaction>, LedgerError> {
        let guard = self.lock()?;
        Ok(guard
            .log
            .iter()
            .filter(|tx| &tx.store == store)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(raw: &str) -> StoreId {
        StoreId::new(raw).expect("valid id")
    }

    fn sku(raw: &str) -> Sku {
        Sku::new(raw).expect("valid sku")
    }

    #[tokio::test]
    async fn first_target_records_the_full_quantity_as_delta() {
        let ledger = InMemoryInventory::default();
        let tx = ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 24, InventoryTransactionKind::InitialSetup, None)
            .await
            .expect("target applies")
            .expect("row recorded");
        assert_eq!(tx.delta, 24);
        assert_eq!(tx.balance_after, 24);
    }

    #[tokio::test]
    async fn retarget_records_the_signed_difference() {
        let ledger = InMemoryInventory::default();
        ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 24, InventoryTransactionKind::InitialSetup, None)
            .await
            .expect("target applies");
        let tx = ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 20, InventoryTransactionKind::Correction, None)
            .await
            .expect("target applies")
            .expect("row recorded");
        assert_eq!(tx.delta, -4);
        assert_eq!(tx.balance_after, 20);

        let level = ledger
            .level(&store("S-1"), &sku("SKU-1"))
            .await
            .expect("level reads")
            .expect("level exists");
        assert_eq!(level.on_hand, 20);
    }

    #[tokio::test]
    async fn zero_target_with_no_level_writes_nothing() {
        let ledger = InMemoryInventory::default();
        let outcome = ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 0, InventoryTransactionKind::InitialSetup, None)
            .await
            .expect("target applies");
        assert!(outcome.is_none());
        assert!(
            ledger
                .transactions(&store("S-1"))
                .await
                .expect("log reads")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn unchanged_existing_level_still_records_a_zero_delta_row() {
        let ledger = InMemoryInventory::default();
        ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 10, InventoryTransactionKind::InitialSetup, None)
            .await
            .expect("target applies");
        let tx = ledger
            .apply_target(&store("S-1"), &sku("SKU-1"), 10, InventoryTransactionKind::Correction, None)
            .await
            .expect("target applies")
            .expect("row recorded");
        assert_eq!(tx.delta, 0);
    }
}
