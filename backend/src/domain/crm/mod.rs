//! CRM sync: keeps the external customer record current across retries.
//!
//! The service implements search-or-create/update against the external
//! customer API. Tag growth is capped by the managed-prefix merge, the note
//! is append-only, the activity log is bounded, and funnel stage tags are
//! mutually exclusive. External failures never propagate as failures of the
//! caller's broader operation; they are logged and folded into the returned
//! outcome record.

pub mod event_log;
pub mod tags;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::brand::BrandAccount;
use super::ids::{BrandId, DisplayId, StoreId};
use super::ports::{
    CrmApiError, CrmCustomerApi, CrmCustomerDraft, CrmCustomerUpdate, CrmEndpoint,
    CrmLinkRepository,
};
use super::vault::CredentialVault;
use self::event_log::{EVENT_LOG_FIELD, EventLogEntry};
use self::tags::FunnelStage;

/// Link between a local store and one brand's external customer record.
///
/// Unique per (store, brand) pair; one local entity linked to two brands
/// owns two distinct external records.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmCustomerLink {
    pub store: StoreId,
    pub brand: BrandId,
    pub external_id: String,
    pub linked_at: DateTime<Utc>,
}

/// What a sync run did to the external record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Skipped,
}

/// Structured result of one sync attempt against one brand account.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmSyncOutcome {
    pub brand: BrandId,
    pub action: SyncAction,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl CrmSyncOutcome {
    fn skipped(brand: &BrandId, reason: impl Into<String>) -> Self {
        Self {
            brand: brand.clone(),
            action: SyncAction::Skipped,
            external_id: None,
            error: Some(reason.into()),
        }
    }
}

/// Snapshot of the local entity pushed to the external record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrmContactSnapshot {
    pub store: Option<StoreId>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub tier: Option<String>,
    pub state_code: Option<String>,
    pub display: Option<DisplayId>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl CrmContactSnapshot {
    /// Managed namespace tags carrying the current snapshot values.
    pub fn managed_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(store) = &self.store {
            tags.push(format!("store:{store}"));
        }
        if let Some(state) = &self.state_code {
            tags.push(format!("state:{state}"));
        }
        if let Some(tier) = &self.tier {
            tags.push(format!("tier:{tier}"));
        }
        tags
    }

    /// Structured fields overwritten with the latest snapshot.
    pub fn structured_fields(&self, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut fields = vec![("last_synced_at".to_owned(), now.to_rfc3339())];
        if let Some(store) = &self.store {
            fields.push(("store_id".to_owned(), store.to_string()));
        }
        if let Some(tier) = &self.tier {
            fields.push(("tier".to_owned(), tier.clone()));
        }
        if let Some(display) = &self.display {
            fields.push(("display_id".to_owned(), display.to_string()));
        }
        if let Some(at) = &self.activated_at {
            fields.push(("activated_at".to_owned(), at.to_rfc3339()));
        }
        fields
    }

    fn note_line(&self, now: DateTime<Utc>) -> String {
        let subject = self
            .store
            .as_ref()
            .map_or_else(|| "contact".to_owned(), |store| format!("store {store}"));
        format!("[{}] synced {subject}", now.to_rfc3339())
    }
}

/// Failure of an explicit CRM operation (event log, stage tagging).
#[derive(Debug, Error)]
pub enum CrmSyncError {
    /// Brand has no usable credentials; the integration is skipped.
    #[error("brand {0} has no usable CRM credentials")]
    Config(BrandId),
    /// The external API call failed.
    #[error(transparent)]
    Api(#[from] CrmApiError),
    /// The bounded log could not be re-encoded.
    #[error("event log encoding failed: {0}")]
    Encode(String),
}

/// Domain service owning the sync algorithm over the customer API port.
pub struct CrmSyncService {
    api: Arc<dyn CrmCustomerApi>,
    vault: Arc<CredentialVault>,
    links: Arc<dyn CrmLinkRepository>,
    /// Fixed inter-call pause when syncing one entity against many brands.
    pause: Duration,
}

impl CrmSyncService {
    /// Build the service over its driven ports.
    pub fn new(
        api: Arc<dyn CrmCustomerApi>,
        vault: Arc<CredentialVault>,
        links: Arc<dyn CrmLinkRepository>,
        pause: Duration,
    ) -> Self {
        Self {
            api,
            vault,
            links,
            pause,
        }
    }

    /// Decrypt the brand's token into a callable endpoint.
    ///
    /// An undecryptable credential is treated as absent, per the vault
    /// contract.
    fn endpoint(&self, brand: &BrandAccount) -> Result<CrmEndpoint, CrmSyncError> {
        let creds = brand
            .crm
            .as_ref()
            .ok_or_else(|| CrmSyncError::Config(brand.id.clone()))?;
        let token = self.vault.decrypt(&creds.encrypted_token).map_err(|err| {
            warn!(brand = %brand.id, error = %err, "crm token could not be decrypted");
            CrmSyncError::Config(brand.id.clone())
        })?;
        Ok(CrmEndpoint {
            api_base: creds.api_base.clone(),
            token,
        })
    }

    /// Search-or-create/update the external record for one brand account.
    ///
    /// Never fails the caller: configuration gaps and API failures come back
    /// inside the outcome record.
    pub async fn sync_contact(
        &self,
        snapshot: &CrmContactSnapshot,
        brand: &BrandAccount,
    ) -> CrmSyncOutcome {
        let endpoint = match self.endpoint(brand) {
            Ok(endpoint) => endpoint,
            Err(_) => return CrmSyncOutcome::skipped(&brand.id, "no usable CRM credentials"),
        };
        let Some(email) = snapshot.email.as_deref() else {
            return CrmSyncOutcome::skipped(&brand.id, "no identifying email on the local entity");
        };

        let now = Utc::now();
        match self.api.search_by_email(&endpoint, email).await {
            Ok(Some(customer)) => {
                let merged = tags::merge_managed(&customer.tags, &snapshot.managed_tags());
                let note = appended_note(customer.note.as_deref(), &snapshot.note_line(now));
                let update = CrmCustomerUpdate {
                    tags: Some(merged),
                    note: Some(note),
                    fields: snapshot.structured_fields(now),
                };
                match self.api.update(&endpoint, &customer.id, &update).await {
                    Ok(()) => {
                        self.persist_link(snapshot, brand, &customer.id, now).await;
                        CrmSyncOutcome {
                            brand: brand.id.clone(),
                            action: SyncAction::Updated,
                            external_id: Some(customer.id),
                            error: None,
                        }
                    }
                    Err(err) => self.api_failure(brand, Some(customer.id), err),
                }
            }
            Ok(None) => {
                let draft = CrmCustomerDraft {
                    email: email.to_owned(),
                    first_name: snapshot.first_name.clone(),
                    tags: snapshot.managed_tags(),
                    note: snapshot.note_line(now),
                    fields: snapshot.structured_fields(now),
                };
                match self.api.create(&endpoint, &draft).await {
                    Ok(external_id) => {
                        self.persist_link(snapshot, brand, &external_id, now).await;
                        CrmSyncOutcome {
                            brand: brand.id.clone(),
                            action: SyncAction::Created,
                            external_id: Some(external_id),
                            error: None,
                        }
                    }
                    Err(err) => self.api_failure(brand, None, err),
                }
            }
            Err(err) => self.api_failure(brand, None, err),
        }
    }

    /// Refresh an already-linked external record after activation.
    ///
    /// Applies the managed tag merge, moves the funnel stage, appends one
    /// note line, overwrites the structured snapshot fields, and records a
    /// bounded timeline event.
    pub async fn sync_activation(
        &self,
        snapshot: &CrmContactSnapshot,
        brand: &BrandAccount,
        external_id: &str,
    ) -> CrmSyncOutcome {
        let endpoint = match self.endpoint(brand) {
            Ok(endpoint) => endpoint,
            Err(_) => return CrmSyncOutcome::skipped(&brand.id, "no usable CRM credentials"),
        };

        let now = Utc::now();
        let customer = match self.api.fetch(&endpoint, external_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                return CrmSyncOutcome::skipped(
                    &brand.id,
                    format!("linked customer {external_id} no longer exists"),
                );
            }
            Err(err) => return self.api_failure(brand, Some(external_id.to_owned()), err),
        };

        let merged = tags::merge_managed(&customer.tags, &snapshot.managed_tags());
        let staged = tags::replace_stage(&merged, FunnelStage::Redeemed);
        let note = appended_note(customer.note.as_deref(), &snapshot.note_line(now));
        let update = CrmCustomerUpdate {
            tags: Some(staged),
            note: Some(note),
            fields: snapshot.structured_fields(now),
        };
        if let Err(err) = self.api.update(&endpoint, external_id, &update).await {
            return self.api_failure(brand, Some(external_id.to_owned()), err);
        }
        self.persist_link(snapshot, brand, external_id, now).await;

        let message = match (&snapshot.display, &snapshot.store) {
            (Some(display), Some(store)) => {
                format!("Display {display} activated at store {store}")
            }
            _ => "Display activated".to_owned(),
        };
        if let Err(err) = self
            .record_event(&endpoint, external_id, &message, now)
            .await
        {
            warn!(brand = %brand.id, error = %err, "activity log append failed");
        }

        CrmSyncOutcome {
            brand: brand.id.clone(),
            action: SyncAction::Updated,
            external_id: Some(external_id.to_owned()),
            error: None,
        }
    }

    /// Sync one local entity against many brand accounts sequentially.
    ///
    /// Calls are paced with a fixed pause to respect third-party rate
    /// limits; this is deliberately not parallelised.
    pub async fn sync_all(
        &self,
        snapshot: &CrmContactSnapshot,
        brands: &[BrandAccount],
    ) -> Vec<CrmSyncOutcome> {
        let mut outcomes = Vec::with_capacity(brands.len());
        for (index, brand) in brands.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            outcomes.push(self.sync_contact(snapshot, brand).await);
        }
        outcomes
    }

    /// Move the customer's funnel stage, removing any competing stage tag.
    pub async fn set_stage(
        &self,
        brand: &BrandAccount,
        external_id: &str,
        stage: FunnelStage,
    ) -> Result<(), CrmSyncError> {
        let endpoint = self.endpoint(brand)?;
        let customer = self
            .api
            .fetch(&endpoint, external_id)
            .await?
            .ok_or_else(|| {
                CrmApiError::invalid_request(format!("customer {external_id} not found"))
            })?;
        let update = CrmCustomerUpdate {
            tags: Some(tags::replace_stage(&customer.tags, stage)),
            ..CrmCustomerUpdate::default()
        };
        self.api.update(&endpoint, external_id, &update).await?;
        Ok(())
    }

    /// Append one entry to the bounded customer activity log.
    async fn record_event(
        &self,
        endpoint: &CrmEndpoint,
        external_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CrmSyncError> {
        let raw = self
            .api
            .read_field(endpoint, external_id, EVENT_LOG_FIELD)
            .await?;
        let encoded = event_log::append_entry(
            raw.as_deref(),
            EventLogEntry {
                timestamp: now,
                message: message.to_owned(),
            },
        )
        .map_err(|err| CrmSyncError::Encode(err.to_string()))?;
        self.api
            .write_field(endpoint, external_id, EVENT_LOG_FIELD, &encoded)
            .await?;
        Ok(())
    }

    async fn persist_link(
        &self,
        snapshot: &CrmContactSnapshot,
        brand: &BrandAccount,
        external_id: &str,
        now: DateTime<Utc>,
    ) {
        let Some(store) = &snapshot.store else {
            return;
        };
        let link = CrmCustomerLink {
            store: store.clone(),
            brand: brand.id.clone(),
            external_id: external_id.to_owned(),
            linked_at: now,
        };
        if let Err(err) = self.links.save(&link).await {
            warn!(brand = %brand.id, store = %store, error = %err, "crm link persistence failed");
        }
    }

    fn api_failure(
        &self,
        brand: &BrandAccount,
        external_id: Option<String>,
        err: CrmApiError,
    ) -> CrmSyncOutcome {
        warn!(brand = %brand.id, error = %err, "crm sync failed");
        CrmSyncOutcome {
            brand: brand.id.clone(),
            action: SyncAction::Skipped,
            external_id,
            error: Some(err.to_string()),
        }
    }
}

/// Append a line to the existing note without overwriting history.
fn appended_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(note) if !note.trim().is_empty() => format!("{note}\n{line}"),
        _ => line.to_owned(),
    }
}
