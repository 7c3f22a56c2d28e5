//! Display unit lifecycle model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BrandId, DisplayId, StoreId};

/// Lifecycle state of a physical display unit.
///
/// Units move `Inventory → Sold → Active`. `Active` is terminal but
/// re-enterable when the linked store record has gone missing after a
/// partially failed activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    /// Owned by the brand, not yet sold to a retailer.
    Inventory,
    /// Sold and assigned to a brand, awaiting activation.
    Sold,
    /// Activated and linked to a store.
    Active,
}

/// A physical, QR-coded unit installed at a retail location.
///
/// Invariant: `status == Active` implies `store_id.is_some()` once the
/// activation claim has committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    pub status: DisplayStatus,
    pub owning_brand: BrandId,
    pub assigned_brand: Option<BrandId>,
    pub store_id: Option<StoreId>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl Display {
    /// Brand responsible for this unit at activation time.
    ///
    /// Units still in `Inventory` belong to their owning brand; sold units
    /// use the assigned brand, falling back to the owner when assignment
    /// never happened.
    pub fn resolved_brand(&self) -> &BrandId {
        match self.status {
            DisplayStatus::Inventory => &self.owning_brand,
            DisplayStatus::Sold | DisplayStatus::Active => {
                self.assigned_brand.as_ref().unwrap_or(&self.owning_brand)
            }
        }
    }
}
