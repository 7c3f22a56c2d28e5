//! Ledger row shapes: append-only transaction logs backing derived balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{DisplayId, Sku, StoreId};

/// Why an inventory quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryTransactionKind {
    /// First stock count recorded when a store is created at activation.
    InitialSetup,
    /// Verification or correction count against an existing store.
    Correction,
    /// Stock consumed by a sample hand-out or sale.
    Sale,
    /// Manual adjustment from outside the activation flow.
    Adjustment,
}

/// Per-(store, SKU) quantity snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevel {
    pub on_hand: i64,
    pub reserved: i64,
}

impl InventoryLevel {
    /// Quantity available for hand-out.
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }
}

/// Immutable inventory ledger row.
///
/// Every ledger-affecting write to an inventory level produces exactly one
/// of these, carrying the signed delta and the resulting balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub store: StoreId,
    pub sku: Sku,
    pub kind: InventoryTransactionKind,
    pub delta: i64,
    pub balance_after: i64,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Direction of a store credit movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionKind {
    Earned,
    Spent,
}

/// Immutable store credit ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCreditTransaction {
    pub id: Uuid,
    pub store: StoreId,
    /// Signed amount in minor currency units.
    pub amount: i64,
    pub kind: CreditTransactionKind,
    pub reason: String,
    pub related_display: Option<DisplayId>,
    pub balance_after: i64,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_subtracts_reserved() {
        let level = InventoryLevel {
            on_hand: 10,
            reserved: 3,
        };
        assert_eq!(level.available(), 7);
    }

    #[test]
    fn transaction_kinds_serialise_snake_case() {
        let value = serde_json::to_value(InventoryTransactionKind::InitialSetup)
            .expect("kind serialises");
        assert_eq!(value, "initial_setup");
    }
}
