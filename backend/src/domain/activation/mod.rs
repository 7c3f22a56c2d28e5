//! Activation orchestrator.
//!
//! Drives a display from `inventory`/`sold` to `active`: validates the
//! request, resolves the responsible brand, links or creates the store,
//! applies inventory targets to the ledger, claims the display with a
//! guarded update, and then fans out best-effort side effects. The
//! authoritative mutation is all-or-nothing; every downstream integration is
//! isolated and reported, never fatal.

pub mod report;
pub mod request;

pub use self::report::{ActivationOutcome, EffectKind, EffectOutcome, EffectStatus};
pub use self::request::{ActivationRequest, InventoryTarget};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use super::brand::BrandAccount;
use super::crm::{CrmContactSnapshot, CrmSyncService};
use super::display::{Display, DisplayStatus};
use super::error::Error;
use super::ids::StoreId;
use super::ledger::InventoryTransactionKind;
use super::ports::{
    ActivationCommand, BrandRepository, BrandRepositoryError, CreditLedger, CrmLinkRepository,
    DisplayRepository, DisplayRepositoryError, InventoryRepository, LedgerError, Notification,
    NotificationChannel, NotificationDispatcher, NotificationKind, StoreRepository,
    StoreRepositoryError,
};
use super::store::Store;

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Deadline for each best-effort side effect; a late effect degrades to
    /// a skipped outcome rather than hanging the request.
    pub effect_timeout: Duration,
    /// One-time setup-photo credit, in minor currency units.
    pub setup_credit_amount: i64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            effect_timeout: Duration::from_secs(5),
            setup_credit_amount: 2_500,
        }
    }
}

/// Parameter object bundling the orchestrator's driven ports.
#[derive(Clone)]
pub struct ActivationPorts {
    pub displays: Arc<dyn DisplayRepository>,
    pub stores: Arc<dyn StoreRepository>,
    pub brands: Arc<dyn BrandRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub credits: Arc<dyn CreditLedger>,
    pub links: Arc<dyn CrmLinkRepository>,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

/// How the store record is resolved for this activation.
///
/// The two paths are deliberately a tagged union rather than an implicit
/// is-an-id-present branch, so each can be exercised in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreResolution {
    /// Patch the identified pre-existing store.
    LinkToExisting(StoreId),
    /// Upsert a store under a reserved (or previously reserved) id.
    CreateNew { reserved: Option<StoreId> },
}

impl StoreResolution {
    fn for_request(request: &ActivationRequest, display: &Display) -> Self {
        match &request.existing_store_id {
            Some(id) => Self::LinkToExisting(id.clone()),
            // A dangling link from a partially failed attempt reserves the
            // id for the retry, so scenario-B recreation lands on the same
            // store id.
            None => Self::CreateNew {
                reserved: display.store_id.clone(),
            },
        }
    }
}

fn map_display_error(error: DisplayRepositoryError) -> Error {
    match error {
        DisplayRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("display repository unavailable: {message}"))
        }
        DisplayRepositoryError::Missing { display_id } => {
            Error::not_found(format!("display {display_id} not found"))
        }
        DisplayRepositoryError::AlreadyActivated {
            display_id,
            store_id,
        } => Error::conflict(format!("display {display_id} is already activated"))
            .with_details(json!({ "storeId": store_id })),
    }
}

fn map_store_error(error: StoreRepositoryError) -> Error {
    match error {
        StoreRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("store repository unavailable: {message}"))
        }
        StoreRepositoryError::Missing { store_id } => {
            Error::not_found(format!("store {store_id} not found"))
        }
    }
}

fn map_brand_error(error: BrandRepositoryError) -> Error {
    match error {
        BrandRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("brand repository unavailable: {message}"))
        }
    }
}

fn map_ledger_error(error: LedgerError) -> Error {
    match error {
        LedgerError::Connection { message } => {
            Error::service_unavailable(format!("ledger unavailable: {message}"))
        }
    }
}

/// The activation state machine over injected ports.
pub struct ActivationService {
    ports: ActivationPorts,
    crm: Arc<CrmSyncService>,
    config: ActivationConfig,
}

impl ActivationService {
    /// Build the orchestrator from its ports and tunables.
    pub fn new(ports: ActivationPorts, crm: Arc<CrmSyncService>, config: ActivationConfig) -> Self {
        Self { ports, crm, config }
    }

    async fn run(&self, request: ActivationRequest) -> Result<ActivationOutcome, Error> {
        // Step 1: validate before touching anything.
        let followup = request.validate()?;

        // Step 2: load the unit and resolve the responsible brand.
        let display = self
            .ports
            .displays
            .find(&request.display_id)
            .await
            .map_err(map_display_error)?
            .ok_or_else(|| Error::not_found(format!("display {} not found", request.display_id)))?;
        let brand_id = display.resolved_brand().clone();
        let brand = self
            .ports
            .brands
            .find(&brand_id)
            .await
            .map_err(map_brand_error)?
            .ok_or_else(|| Error::not_found(format!("brand account {brand_id} not found")))?;

        let unknown_sku = request
            .sample_skus
            .iter()
            .chain(request.initial_inventory.keys())
            .find(|sku| !brand.carries_sku(sku));
        if let Some(sku) = unknown_sku {
            return Err(Error::invalid_request(format!(
                "SKU {sku} is not in the {} catalogue",
                brand.name
            ))
            .with_details(json!({ "missingFields": ["sampleSkus"], "sku": sku.as_str() })));
        }

        // Step 3: idempotency guard. A live linked store means this unit is
        // done; a dangling link from a partial failure allows re-entry.
        if display.status == DisplayStatus::Active {
            if let Some(store_id) = &display.store_id {
                if self
                    .ports
                    .stores
                    .find(store_id)
                    .await
                    .map_err(map_store_error)?
                    .is_some()
                {
                    return Err(Error::conflict(format!(
                        "display {} is already activated",
                        display.id
                    ))
                    .with_details(json!({ "storeId": store_id.as_str() })));
                }
            }
        }

        // Step 4: resolve the store through the tagged union.
        let now = Utc::now();
        let resolution = StoreResolution::for_request(&request, &display);
        let (store, created) = match resolution {
            StoreResolution::LinkToExisting(id) => {
                let patch = request.store_patch(followup);
                let store = self
                    .ports
                    .stores
                    .patch(&id, patch, now)
                    .await
                    .map_err(map_store_error)?;
                (store, false)
            }
            StoreResolution::CreateNew { reserved } => {
                let id = match reserved {
                    Some(id) => id,
                    None => self
                        .ports
                        .stores
                        .reserve_id()
                        .await
                        .map_err(map_store_error)?,
                };
                let store = request.build_store(id, followup, now);
                self.ports
                    .stores
                    .upsert(&store)
                    .await
                    .map_err(map_store_error)?;
                (store, true)
            }
        };

        // Step 5: move each supplied SKU to its target quantity, one
        // transaction row per ledger-affecting write.
        let kind = if created {
            InventoryTransactionKind::InitialSetup
        } else {
            InventoryTransactionKind::Correction
        };
        for (sku, target) in &request.initial_inventory {
            let notes = inventory_notes(created, target.is_presale);
            self.ports
                .inventory
                .apply_target(&store.id, sku, target.quantity, kind, Some(notes))
                .await
                .map_err(map_ledger_error)?;
        }

        // Step 6: claim the unit. First writer wins; a repeat claim with the
        // same store id is a no-op success.
        let claimed = self
            .ports
            .displays
            .claim_activation(&display.id, &store.id, now)
            .await
            .map_err(map_display_error)?;

        // Step 7: best-effort fan-out, each effect isolated and reported.
        let effects = vec![
            self.crm_effect(&request, &brand, &store, &claimed).await,
            self.credit_effect(&request, &store, &claimed).await,
            self.notification_effect(&brand, &store, &claimed).await,
        ];

        Ok(ActivationOutcome {
            message: format!("display {} activated for {}", claimed.id, store.name),
            store_id: store.id.clone(),
            store_name: store.name.clone(),
            effects,
        })
    }

    /// Refresh the external customer record, but only when an external id is
    /// already linked to the entity.
    async fn crm_effect(
        &self,
        request: &ActivationRequest,
        brand: &BrandAccount,
        store: &Store,
        display: &Display,
    ) -> EffectOutcome {
        let external_id = match &request.crm_customer_id {
            Some(id) => Some(id.clone()),
            None => match self.ports.links.find(&store.id, &brand.id).await {
                Ok(link) => link.map(|link| link.external_id),
                Err(err) => {
                    warn!(error = %err, "crm link lookup failed");
                    None
                }
            },
        };
        let Some(external_id) = external_id else {
            return EffectOutcome::skipped(EffectKind::CrmSync, "no linked CRM customer");
        };

        let snapshot = CrmContactSnapshot {
            store: Some(store.id.clone()),
            email: Some(store.contact.email.clone()),
            first_name: None,
            tier: None,
            state_code: Some(store.state_code.clone()),
            display: Some(display.id.clone()),
            activated_at: display.activated_at,
        };
        match tokio::time::timeout(
            self.config.effect_timeout,
            self.crm.sync_activation(&snapshot, brand, &external_id),
        )
        .await
        {
            Ok(outcome) => match outcome.error {
                Some(error) => EffectOutcome::failed(EffectKind::CrmSync, error),
                None => EffectOutcome::ran(
                    EffectKind::CrmSync,
                    format!("customer {external_id} refreshed"),
                ),
            },
            Err(_) => EffectOutcome::skipped(EffectKind::CrmSync, "deadline exceeded"),
        }
    }

    /// Grant the one-time setup credit when a setup photo is present.
    async fn credit_effect(
        &self,
        request: &ActivationRequest,
        store: &Store,
        display: &Display,
    ) -> EffectOutcome {
        if request.setup_photo_url.is_none() {
            return EffectOutcome::skipped(EffectKind::CreditGrant, "no setup photo supplied");
        }
        match tokio::time::timeout(
            self.config.effect_timeout,
            self.ports.credits.grant_setup_credit(
                &store.id,
                self.config.setup_credit_amount,
                &display.id,
            ),
        )
        .await
        {
            Ok(Ok(Some(tx))) => EffectOutcome::ran(
                EffectKind::CreditGrant,
                format!("granted {} credit", tx.amount),
            ),
            Ok(Ok(None)) => {
                EffectOutcome::skipped(EffectKind::CreditGrant, "setup credit already granted")
            }
            Ok(Err(err)) => {
                warn!(error = %err, "setup credit grant failed");
                EffectOutcome::failed(EffectKind::CreditGrant, err.to_string())
            }
            Err(_) => EffectOutcome::skipped(EffectKind::CreditGrant, "deadline exceeded"),
        }
    }

    /// Notify the activating contact and the brand owner over both channels.
    async fn notification_effect(
        &self,
        brand: &BrandAccount,
        store: &Store,
        display: &Display,
    ) -> EffectOutcome {
        let context = vec![
            ("store_name".to_owned(), store.name.clone()),
            ("display_id".to_owned(), display.id.to_string()),
            ("brand_name".to_owned(), brand.name.clone()),
        ];
        let mut sends = vec![
            Notification {
                channel: NotificationChannel::Sms,
                recipient: store.contact.phone.clone(),
                kind: NotificationKind::StoreActivated,
                context: context.clone(),
            },
            Notification {
                channel: NotificationChannel::Email,
                recipient: store.contact.email.clone(),
                kind: NotificationKind::StoreActivated,
                context: context.clone(),
            },
            Notification {
                channel: NotificationChannel::Email,
                recipient: brand.owner_contact.email.clone(),
                kind: NotificationKind::BrandDisplayActivated,
                context: context.clone(),
            },
        ];
        if let Some(phone) = &brand.owner_contact.phone {
            sends.push(Notification {
                channel: NotificationChannel::Sms,
                recipient: phone.clone(),
                kind: NotificationKind::BrandDisplayActivated,
                context,
            });
        }

        let mut failures = Vec::new();
        let total = sends.len();
        for notification in sends {
            match tokio::time::timeout(
                self.config.effect_timeout,
                self.ports.notifier.dispatch(&notification),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(error = %err, recipient = %notification.recipient, "notification failed");
                    failures.push(err.to_string());
                }
                Err(_) => failures.push("deadline exceeded".to_owned()),
            }
        }
        if failures.is_empty() {
            EffectOutcome::ran(EffectKind::Notifications, format!("{total} sends dispatched"))
        } else {
            EffectOutcome::failed(EffectKind::Notifications, failures.join("; "))
        }
    }
}

fn inventory_notes(created: bool, is_presale: bool) -> String {
    let base = if created {
        "initial stock count at activation"
    } else {
        "verification count at activation"
    };
    if is_presale {
        format!("{base} (presale)")
    } else {
        base.to_owned()
    }
}

#[async_trait]
impl ActivationCommand for ActivationService {
    async fn activate(&self, request: ActivationRequest) -> Result<ActivationOutcome, Error> {
        self.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{DisplayId, Sku};

    fn display(store_id: Option<&str>) -> Display {
        Display {
            id: DisplayId::new("D-1").expect("valid id"),
            status: DisplayStatus::Sold,
            owning_brand: crate::domain::ids::BrandId::new("B-A").expect("valid id"),
            assigned_brand: None,
            store_id: store_id.map(|id| StoreId::new(id).expect("valid id")),
            activated_at: None,
        }
    }

    fn request(existing: Option<&str>) -> ActivationRequest {
        ActivationRequest {
            display_id: DisplayId::new("D-1").expect("valid id"),
            store_name: Some("Corner Market".to_owned()),
            email: "owner@corner.example".to_owned(),
            phone: "4155550100".to_owned(),
            pin: "1234".to_owned(),
            zip: "94107".to_owned(),
            state_code: "CA".to_owned(),
            promo: None,
            followup_days: vec![4, 12],
            sample_skus: vec![Sku::new("SKU-1").expect("valid sku")],
            product_skus: vec![],
            existing_store_id: existing.map(|id| StoreId::new(id).expect("valid id")),
            crm_customer_id: None,
            setup_photo_url: None,
            initial_inventory: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn explicit_store_id_selects_link_mode() {
        let resolution = StoreResolution::for_request(&request(Some("S-7")), &display(None));
        assert_eq!(
            resolution,
            StoreResolution::LinkToExisting(StoreId::new("S-7").expect("valid id"))
        );
    }

    #[test]
    fn dangling_link_reserves_the_previous_id() {
        let resolution = StoreResolution::for_request(&request(None), &display(Some("S-1")));
        assert_eq!(
            resolution,
            StoreResolution::CreateNew {
                reserved: Some(StoreId::new("S-1").expect("valid id"))
            }
        );
    }

    #[test]
    fn conflict_mapping_carries_the_linked_store_id() {
        let err = map_display_error(DisplayRepositoryError::AlreadyActivated {
            display_id: "D-1".to_owned(),
            store_id: "S-1".to_owned(),
        });
        assert_eq!(err.code(), crate::domain::ErrorCode::Conflict);
        let details = err.details().expect("details present");
        assert_eq!(details["storeId"], "S-1");
    }
}
