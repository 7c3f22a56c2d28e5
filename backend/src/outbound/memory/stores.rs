//! In-memory store repository with a monotonic id sequence.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ids::StoreId;
use crate::domain::ports::{StoreRepository, StoreRepositoryError};
use crate::domain::store::{Store, StorePatch};

/// Mutex-backed store table plus an atomic id counter.
///
/// Ids follow the `S-{n}` convention; the counter only moves forward, so a
/// reserved id stays burned even when the activation that reserved it never
/// completes.
#[derive(Default)]
pub struct InMemoryStores {
    stores: Mutex<HashMap<StoreId, Store>>,
    sequence: AtomicU64,
}

impl InMemoryStores {
    /// Build an adapter seeded with existing stores, advancing the sequence
    /// past any `S-{n}` ids found in the seed.
    pub fn seeded(stores: impl IntoIterator<Item = Store>) -> Self {
        let stores: HashMap<StoreId, Store> = stores
            .into_iter()
            .map(|store| (store.id.clone(), store))
            .collect();
        let highest = stores
            .keys()
            .filter_map(|id| id.as_str().strip_prefix("S-"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            stores: Mutex::new(stores),
            sequence: AtomicU64::new(highest),
        }
    }

    /// Remove a store, simulating out-of-band deletion.
    pub fn remove(&self, id: &StoreId) -> Result<Option<Store>, StoreRepositoryError> {
        let mut guard = self
            .stores
            .lock()
            .map_err(|_| StoreRepositoryError::connection("store lock poisoned"))?;
        Ok(guard.remove(id))
    }
}

#[async_trait]
impl StoreRepository for InMemoryStores {
    async fn find(&self, id: &StoreId) -> Result<Option<Store>, StoreRepositoryError> {
        let guard = self
            .stores
            .lock()
            .map_err(|_| StoreRepositoryError::connection("store lock poisoned"))?;
        Ok(guard.get(id).cloned())
    }

    async fn reserve_id(&self) -> Result<StoreId, StoreRepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        StoreId::new(format!("S-{next}"))
            .map_err(|err| StoreRepositoryError::connection(err.to_string()))
    }

    async fn upsert(&self, store: &Store) -> Result<(), StoreRepositoryError> {
        let mut guard = self
            .stores
            .lock()
            .map_err(|_| StoreRepositoryError::connection("store lock poisoned"))?;
        guard.insert(store.id.clone(), store.clone());
        Ok(())
    }

    async fn patch(
        &self,
        id: &StoreId,
        patch: StorePatch,
        at: DateTime<Utc>,
    ) -> Result<Store, StoreRepositoryError> {
        let mut guard = self
            .stores
            .lock()
            .map_err(|_| StoreRepositoryError::connection("store lock poisoned"))?;
        let store = guard.get_mut(id).ok_or_else(|| StoreRepositoryError::Missing {
            store_id: id.to_string(),
        })?;
        store.apply_patch(patch, at);
        Ok(store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserved_ids_are_sequential_and_unique() {
        let repo = InMemoryStores::default();
        let first = repo.reserve_id().await.expect("first id");
        let second = repo.reserve_id().await.expect("second id");
        assert_eq!(first.as_str(), "S-1");
        assert_eq!(second.as_str(), "S-2");
    }

    #[tokio::test]
    async fn seeding_advances_the_sequence_past_existing_ids() {
        let store = crate::domain::store::Store {
            id: StoreId::new("S-7").expect("valid id"),
            name: "Corner Market".to_owned(),
            contact: crate::domain::store::StoreContact {
                email: "owner@corner.example".to_owned(),
                phone: "4155550100".to_owned(),
            },
            pin: "1234".to_owned(),
            zip: "94107".to_owned(),
            state_code: "CA".to_owned(),
            promo: crate::domain::store::PromoConfig::default(),
            followup_days: crate::domain::store::FollowupDays::new(&[4, 12]).expect("two values"),
            sample_skus: vec![],
            product_skus: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let repo = InMemoryStores::seeded([store]);
        let next = repo.reserve_id().await.expect("next id");
        assert_eq!(next.as_str(), "S-8");
    }

    #[tokio::test]
    async fn patching_a_missing_store_is_reported() {
        let repo = InMemoryStores::default();
        let err = repo
            .patch(
                &StoreId::new("S-9").expect("valid id"),
                StorePatch::default(),
                Utc::now(),
            )
            .await
            .expect_err("missing store");
        assert!(matches!(err, StoreRepositoryError::Missing { .. }));
    }
}
