//! In-memory brand account repository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::brand::BrandAccount;
use crate::domain::ids::BrandId;
use crate::domain::ports::{BrandRepository, BrandRepositoryError};

/// Mutex-backed brand table keyed by brand id.
#[derive(Default)]
pub struct InMemoryBrands {
    brands: Mutex<HashMap<BrandId, BrandAccount>>,
}

impl InMemoryBrands {
    /// Build an adapter seeded with the given brand accounts.
    pub fn seeded(brands: impl IntoIterator<Item = BrandAccount>) -> Self {
        Self {
            brands: Mutex::new(
                brands
                    .into_iter()
                    .map(|brand| (brand.id.clone(), brand))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl BrandRepository for InMemoryBrands {
    async fn find(&self, id: &BrandId) -> Result<Option<BrandAccount>, BrandRepositoryError> {
        let guard = self.brands.lock().map_err(|_| BrandRepositoryError::Connection {
            message: "brand lock poisoned".to_owned(),
        })?;
        Ok(guard.get(id).cloned())
    }
}
