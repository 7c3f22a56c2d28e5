//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (repositories, the external customer API, notification channels) and how
//! inbound adapters drive the activation use case. Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::activation::{ActivationOutcome, ActivationRequest};
use super::brand::BrandAccount;
use super::crm::CrmCustomerLink;
use super::display::Display;
use super::error::Error;
use super::ids::{BrandId, DisplayId, Sku, StoreId};
use super::ledger::{
    InventoryLevel, InventoryTransaction, InventoryTransactionKind, StoreCreditTransaction,
};
use super::store::{Store, StorePatch};

/// Errors surfaced by the display repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayRepositoryError {
    /// Storage connectivity or transaction failure.
    #[error("display repository unavailable: {message}")]
    Connection { message: String },
    /// The referenced display does not exist.
    #[error("display {display_id} not found")]
    Missing { display_id: String },
    /// A concurrent or earlier activation already claimed this display.
    #[error("display {display_id} is already activated against store {store_id}")]
    AlreadyActivated {
        display_id: String,
        store_id: String,
    },
}

impl DisplayRepositoryError {
    /// Helper for connection-level failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Persistence port for display units.
#[async_trait]
pub trait DisplayRepository: Send + Sync {
    /// Fetch a display by identifier.
    async fn find(&self, id: &DisplayId) -> Result<Option<Display>, DisplayRepositoryError>;

    /// Claim the display for activation in one guarded update.
    ///
    /// The claim flips the status to `Active`, links the store, and stamps
    /// the activation time, but only when the display is not already claimed
    /// by a different store. Re-claiming with the same store id is a no-op
    /// success so partially failed activations can re-enter. First writer
    /// wins; the loser receives [`DisplayRepositoryError::AlreadyActivated`].
    async fn claim_activation(
        &self,
        id: &DisplayId,
        store: &StoreId,
        at: DateTime<Utc>,
    ) -> Result<Display, DisplayRepositoryError>;
}

/// Errors surfaced by the store repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreRepositoryError {
    /// Storage connectivity or transaction failure.
    #[error("store repository unavailable: {message}")]
    Connection { message: String },
    /// The referenced store does not exist.
    #[error("store {store_id} not found")]
    Missing { store_id: String },
}

impl StoreRepositoryError {
    /// Helper for connection-level failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Persistence port for store records.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Fetch a store by identifier.
    async fn find(&self, id: &StoreId) -> Result<Option<Store>, StoreRepositoryError>;

    /// Reserve the next store identifier from a monotonic sequence.
    ///
    /// Reservation replaces count-and-increment id generation so concurrent
    /// create-mode activations cannot mint the same id.
    async fn reserve_id(&self) -> Result<StoreId, StoreRepositoryError>;

    /// Insert or replace a store keyed by its id. Exact-input retries must
    /// not duplicate the record.
    async fn upsert(&self, store: &Store) -> Result<(), StoreRepositoryError>;

    /// Apply a partial update to an existing store.
    async fn patch(
        &self,
        id: &StoreId,
        patch: StorePatch,
        at: DateTime<Utc>,
    ) -> Result<Store, StoreRepositoryError>;
}

/// Errors surfaced by the brand repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrandRepositoryError {
    /// Storage connectivity or transaction failure.
    #[error("brand repository unavailable: {message}")]
    Connection { message: String },
}

/// Read-only port for brand tenant accounts.
#[async_trait]
pub trait BrandRepository: Send + Sync {
    /// Fetch a brand account by identifier.
    async fn find(&self, id: &BrandId) -> Result<Option<BrandAccount>, BrandRepositoryError>;
}

/// Errors surfaced by the ledger adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Storage connectivity or transaction failure.
    #[error("ledger unavailable: {message}")]
    Connection { message: String },
}

impl LedgerError {
    /// Helper for connection-level failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Persistence port for per-(store, SKU) inventory levels and their
/// transaction log.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Current level for a (store, SKU) pair, if any has been recorded.
    async fn level(&self, store: &StoreId, sku: &Sku)
    -> Result<Option<InventoryLevel>, LedgerError>;

    /// Move a (store, SKU) level to `target` in one atomic step.
    ///
    /// Reads the current on-hand quantity, computes the signed delta, upserts
    /// the level, and appends exactly one transaction row carrying the delta
    /// and resulting balance. Returns `None` without writing anything when no
    /// level exists yet and the delta would be zero.
    async fn apply_target(
        &self,
        store: &StoreId,
        sku: &Sku,
        target: i64,
        kind: InventoryTransactionKind,
        notes: Option<String>,
    ) -> Result<Option<InventoryTransaction>, LedgerError>;

    /// Transaction rows recorded for a store, oldest first.
    async fn transactions(&self, store: &StoreId)
    -> Result<Vec<InventoryTransaction>, LedgerError>;
}

/// Persistence port for store credit balances and their transaction log.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Grant the one-time setup credit if it has not been granted yet.
    ///
    /// Balance mutation, transaction row, and the granted flag move in one
    /// atomic unit. Returns `None` when the store already received the
    /// credit, no matter how often activation retries.
    async fn grant_setup_credit(
        &self,
        store: &StoreId,
        amount: i64,
        related_display: &DisplayId,
    ) -> Result<Option<StoreCreditTransaction>, LedgerError>;

    /// Current credit balance for a store.
    async fn balance(&self, store: &StoreId) -> Result<i64, LedgerError>;

    /// Credit rows recorded for a store, oldest first.
    async fn transactions(
        &self,
        store: &StoreId,
    ) -> Result<Vec<StoreCreditTransaction>, LedgerError>;
}

/// Errors surfaced by the CRM link repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmLinkError {
    /// Storage connectivity or transaction failure.
    #[error("crm link repository unavailable: {message}")]
    Connection { message: String },
}

/// Persistence port for (store, brand) → external customer id links.
#[async_trait]
pub trait CrmLinkRepository: Send + Sync {
    /// Fetch the link for a (store, brand) pair.
    async fn find(
        &self,
        store: &StoreId,
        brand: &BrandId,
    ) -> Result<Option<CrmCustomerLink>, CrmLinkError>;

    /// Insert or replace the link for its (store, brand) pair.
    async fn save(&self, link: &CrmCustomerLink) -> Result<(), CrmLinkError>;
}

/// Connection details for one brand's customer API, token already decrypted.
#[derive(Debug, Clone)]
pub struct CrmEndpoint {
    pub api_base: Url,
    pub token: String,
}

/// External customer record as the API returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmCustomer {
    pub id: String,
    pub email: String,
    pub tags: Vec<String>,
    pub note: Option<String>,
}

/// Payload for creating a new external customer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmCustomerDraft {
    pub email: String,
    pub first_name: Option<String>,
    pub tags: Vec<String>,
    pub note: String,
    pub fields: Vec<(String, String)>,
}

/// Partial update for an existing external customer record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrmCustomerUpdate {
    pub tags: Option<Vec<String>>,
    pub note: Option<String>,
    pub fields: Vec<(String, String)>,
}

/// Errors surfaced by the external customer API adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmApiError {
    /// Network-level failure reaching the API.
    #[error("crm transport failure: {message}")]
    Transport { message: String },
    /// The call exceeded its deadline.
    #[error("crm call timed out: {message}")]
    Timeout { message: String },
    /// The API throttled the caller.
    #[error("crm rate limited: {message}")]
    RateLimited { message: String },
    /// The API rejected the request as malformed.
    #[error("crm rejected request: {message}")]
    InvalidRequest { message: String },
    /// The response body could not be decoded.
    #[error("crm response decode failure: {message}")]
    Decode { message: String },
}

impl CrmApiError {
    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for timeouts.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Helper for throttling responses.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Helper for request rejections.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Helper for decode failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Driven port for the external customer API.
///
/// The adapter owns transport details only; tag-merge and note semantics
/// live in the domain [`crate::domain::crm::CrmSyncService`].
#[async_trait]
pub trait CrmCustomerApi: Send + Sync {
    /// Look up a customer by their identifying email. One round trip.
    async fn search_by_email(
        &self,
        endpoint: &CrmEndpoint,
        email: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError>;

    /// Fetch a customer by external id.
    async fn fetch(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError>;

    /// Create a new customer record, returning its external id.
    async fn create(
        &self,
        endpoint: &CrmEndpoint,
        draft: &CrmCustomerDraft,
    ) -> Result<String, CrmApiError>;

    /// Update tags, note, or structured fields on an existing record.
    async fn update(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        update: &CrmCustomerUpdate,
    ) -> Result<(), CrmApiError>;

    /// Read one structured field from a customer record.
    async fn read_field(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        key: &str,
    ) -> Result<Option<String>, CrmApiError>;

    /// Write one structured field on a customer record.
    async fn write_field(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CrmApiError>;
}

/// Outbound notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Sms,
    Email,
}

/// Which externally rendered template the dispatcher should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to the contact who activated the display.
    StoreActivated,
    /// Sent to the brand-side owner contact.
    BrandDisplayActivated,
}

/// A notification request; template rendering happens outside this core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub kind: NotificationKind,
    /// Template context: store name, display id, and similar snippets.
    pub context: Vec<(String, String)>,
}

/// Errors surfaced by the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The channel provider rejected or failed the send.
    #[error("notification dispatch failed: {message}")]
    Dispatch { message: String },
}

impl NotifyError {
    /// Helper for dispatch failures.
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }
}

/// Driven port for outbound SMS and email sends.
///
/// Sends are at-least-once and fire-and-forget; duplicate delivery on retry
/// is tolerated by the receiving templates.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hand a notification to the channel provider.
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Driving port for the activation use case.
#[async_trait]
pub trait ActivationCommand: Send + Sync {
    /// Run the activation state machine for one request.
    async fn activate(&self, request: ActivationRequest) -> Result<ActivationOutcome, Error>;
}
