//! Activation outcome and the structured side-effect report.
//!
//! Side effects run after the authoritative mutation commits. Each one
//! yields its own outcome into the report instead of being silently
//! swallowed inline, so callers can see exactly which integrations degraded.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::StoreId;

/// Which best-effort integration an outcome describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// External customer record refresh.
    CrmSync,
    /// One-time setup-photo credit grant.
    CreditGrant,
    /// SMS/email sends to the activator and the brand owner.
    Notifications,
}

/// How the effect finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EffectStatus {
    /// The effect ran to completion.
    Ran,
    /// Preconditions were not met or the deadline passed; nothing happened.
    Skipped,
    /// The effect ran and failed; the activation outcome is unaffected.
    Failed,
}

/// One entry in the side-effect report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectOutcome {
    pub effect: EffectKind,
    pub status: EffectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EffectOutcome {
    /// The effect completed.
    pub fn ran(effect: EffectKind, detail: impl Into<String>) -> Self {
        Self {
            effect,
            status: EffectStatus::Ran,
            detail: Some(detail.into()),
        }
    }

    /// The effect did not run.
    pub fn skipped(effect: EffectKind, detail: impl Into<String>) -> Self {
        Self {
            effect,
            status: EffectStatus::Skipped,
            detail: Some(detail.into()),
        }
    }

    /// The effect ran and failed.
    pub fn failed(effect: EffectKind, detail: impl Into<String>) -> Self {
        Self {
            effect,
            status: EffectStatus::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// Successful activation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationOutcome {
    pub store_id: StoreId,
    pub store_name: String,
    pub message: String,
    pub effects: Vec<EffectOutcome>,
}
