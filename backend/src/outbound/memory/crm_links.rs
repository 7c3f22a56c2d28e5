//! In-memory (store, brand) → external customer id link table.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::crm::CrmCustomerLink;
use crate::domain::ids::{BrandId, StoreId};
use crate::domain::ports::{CrmLinkError, CrmLinkRepository};

/// Mutex-backed link table keyed by the (store, brand) pair.
#[derive(Default)]
pub struct InMemoryCrmLinks {
    links: Mutex<HashMap<(StoreId, BrandId), CrmCustomerLink>>,
}

#[async_trait]
impl CrmLinkRepository for InMemoryCrmLinks {
    async fn find(
        &self,
        store: &StoreId,
        brand: &BrandId,
    ) -> Result<Option<CrmCustomerLink>, CrmLinkError> {
        let guard = self.links.lock().map_err(|_| CrmLinkError::Connection {
            message: "link lock poisoned".to_owned(),
        })?;
        Ok(guard.get(&(store.clone(), brand.clone())).cloned())
    }

    async fn save(&self, link: &CrmCustomerLink) -> Result<(), CrmLinkError> {
        let mut guard = self.links.lock().map_err(|_| CrmLinkError::Connection {
            message: "link lock poisoned".to_owned(),
        })?;
        guard.insert((link.store.clone(), link.brand.clone()), link.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn links_are_unique_per_store_brand_pair() {
        let repo = InMemoryCrmLinks::default();
        let store = StoreId::new("S-1").expect("valid id");
        let brand_a = BrandId::new("B-A").expect("valid id");
        let brand_b = BrandId::new("B-B").expect("valid id");

        for (brand, external) in [(&brand_a, "cust-1"), (&brand_b, "cust-2")] {
            repo.save(&CrmCustomerLink {
                store: store.clone(),
                brand: brand.clone(),
                external_id: external.to_owned(),
                linked_at: Utc::now(),
            })
            .await
            .expect("link saves");
        }

        let found = repo
            .find(&store, &brand_b)
            .await
            .expect("find runs")
            .expect("link exists");
        assert_eq!(found.external_id, "cust-2");
    }

    #[tokio::test]
    async fn saving_again_replaces_the_link() {
        let repo = InMemoryCrmLinks::default();
        let store = StoreId::new("S-1").expect("valid id");
        let brand = BrandId::new("B-A").expect("valid id");
        for external in ["cust-1", "cust-9"] {
            repo.save(&CrmCustomerLink {
                store: store.clone(),
                brand: brand.clone(),
                external_id: external.to_owned(),
                linked_at: Utc::now(),
            })
            .await
            .expect("link saves");
        }
        let found = repo
            .find(&store, &brand)
            .await
            .expect("find runs")
            .expect("link exists");
        assert_eq!(found.external_id, "cust-9");
    }
}
