//! Retail store record and its mutable-field patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{Sku, StoreId};

/// Contact details for the person who activated the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreContact {
    pub email: String,
    pub phone: String,
}

/// Promotional configuration shown to store customers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoConfig {
    pub discount_code: Option<String>,
    pub message: Option<String>,
}

/// Follow-up day selection: exactly two values, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct FollowupDays([u8; 2]);

/// Validation error for [`FollowupDays`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FollowupDaysError {
    /// The selection did not contain exactly two values.
    #[error("followup days require exactly two values, got {0}")]
    ExpectedTwo(usize),
}

impl FollowupDays {
    /// Construct from a caller-supplied list, rejecting anything but two
    /// entries.
    ///
    /// # Examples
    /// ```
    /// use activation_backend::domain::FollowupDays;
    ///
    /// let days = FollowupDays::new(&[4, 12]).expect("two values");
    /// assert_eq!(days.as_pair(), (4, 12));
    /// assert!(FollowupDays::new(&[4]).is_err());
    /// ```
    pub fn new(days: &[u8]) -> Result<Self, FollowupDaysError> {
        match days {
            [first, second] => Ok(Self([*first, *second])),
            other => Err(FollowupDaysError::ExpectedTwo(other.len())),
        }
    }

    /// The two selected day offsets, in submission order.
    pub fn as_pair(&self) -> (u8, u8) {
        (self.0[0], self.0[1])
    }
}

impl TryFrom<Vec<u8>> for FollowupDays {
    type Error = FollowupDaysError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FollowupDays> for Vec<u8> {
    fn from(value: FollowupDays) -> Self {
        value.0.to_vec()
    }
}

/// The retail-location record created or linked during activation.
///
/// Stores are created once and then updated repeatedly by dashboards outside
/// this subsystem; the orchestrator only touches them at activation time.
/// Credit balance and the one-time setup-credit flag are owned by the credit
/// ledger port, so the grant stays a single guarded operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub contact: StoreContact,
    pub pin: String,
    pub zip: String,
    pub state_code: String,
    pub promo: PromoConfig,
    pub followup_days: FollowupDays,
    pub sample_skus: Vec<Sku>,
    pub product_skus: Vec<Sku>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to a pre-existing store in link mode.
///
/// `None` fields are left untouched, matching the activation contract of
/// never clobbering dashboard-managed values the caller did not supply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePatch {
    pub name: Option<String>,
    pub contact: Option<StoreContact>,
    pub pin: Option<String>,
    pub promo: Option<PromoConfig>,
    pub followup_days: Option<FollowupDays>,
    pub sample_skus: Option<Vec<Sku>>,
    pub product_skus: Option<Vec<Sku>>,
}

impl Store {
    /// Apply a partial update, stamping `updated_at`.
    pub fn apply_patch(&mut self, patch: StorePatch, at: DateTime<Utc>) {
        let StorePatch {
            name,
            contact,
            pin,
            promo,
            followup_days,
            sample_skus,
            product_skus,
        } = patch;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        if let Some(pin) = pin {
            self.pin = pin;
        }
        if let Some(promo) = promo {
            self.promo = promo;
        }
        if let Some(days) = followup_days {
            self.followup_days = days;
        }
        if let Some(samples) = sample_skus {
            self.sample_skus = samples;
        }
        if let Some(products) = product_skus {
            self.product_skus = products;
        }
        self.updated_at = at;
    }
}
