//! In-memory display repository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::display::{Display, DisplayStatus};
use crate::domain::ids::{DisplayId, StoreId};
use crate::domain::ports::{DisplayRepository, DisplayRepositoryError};

/// Mutex-backed display store keyed by display id.
#[derive(Default)]
pub struct InMemoryDisplays {
    displays: Mutex<HashMap<DisplayId, Display>>,
}

impl InMemoryDisplays {
    /// Build an adapter seeded with the given displays.
    pub fn seeded(displays: impl IntoIterator<Item = Display>) -> Self {
        Self {
            displays: Mutex::new(
                displays
                    .into_iter()
                    .map(|display| (display.id.clone(), display))
                    .collect(),
            ),
        }
    }

    /// Insert or replace a display.
    pub fn insert(&self, display: Display) -> Result<(), DisplayRepositoryError> {
        let mut guard = self
            .displays
            .lock()
            .map_err(|_| DisplayRepositoryError::connection("display lock poisoned"))?;
        guard.insert(display.id.clone(), display);
        Ok(())
    }
}

#[async_trait]
impl DisplayRepository for InMemoryDisplays {
    async fn find(&self, id: &DisplayId) -> Result<Option<Display>, DisplayRepositoryError> {
        let guard = self
            .displays
            .lock()
            .map_err(|_| DisplayRepositoryError::connection("display lock poisoned"))?;
        Ok(guard.get(id).cloned())
    }

    async fn claim_activation(
        &self,
        id: &DisplayId,
        store: &StoreId,
        at: DateTime<Utc>,
    ) -> Result<Display, DisplayRepositoryError> {
        let mut guard = self
            .displays
            .lock()
            .map_err(|_| DisplayRepositoryError::connection("display lock poisoned"))?;
        let display = guard
            .get_mut(id)
            .ok_or_else(|| DisplayRepositoryError::Missing {
                display_id: id.to_string(),
            })?;

        if display.status == DisplayStatus::Active {
            match &display.store_id {
                // Re-entry from a partial failure keeps the original claim.
                Some(linked) if linked == store => return Ok(display.clone()),
                Some(linked) => {
                    return Err(DisplayRepositoryError::AlreadyActivated {
                        display_id: id.to_string(),
                        store_id: linked.to_string(),
                    });
                }
                None => {}
            }
        }

        display.status = DisplayStatus::Active;
        display.store_id = Some(store.clone());
        display.activated_at = Some(at);
        Ok(display.clone())
    }
}
