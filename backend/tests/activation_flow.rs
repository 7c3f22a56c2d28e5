//! End-to-end activation scenarios over the in-memory adapters.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use activation_backend::domain::activation::{
    ActivationConfig, ActivationPorts, ActivationRequest, ActivationService, EffectKind,
    EffectStatus, InventoryTarget,
};
use activation_backend::domain::brand::{BrandAccount, CrmCredentials, OwnerContact, Product};
use activation_backend::domain::crm::CrmSyncService;
use activation_backend::domain::display::{Display, DisplayStatus};
use activation_backend::domain::ids::{BrandId, DisplayId, Sku, StoreId};
use activation_backend::domain::ports::{
    ActivationCommand, CreditLedger, CrmApiError, CrmCustomer, CrmCustomerApi, CrmCustomerDraft,
    CrmCustomerUpdate, CrmEndpoint, DisplayRepository, InventoryRepository, StoreRepository,
};
use activation_backend::domain::{CredentialVault, ErrorCode, MasterSecret};
use activation_backend::outbound::memory::{
    InMemoryBrands, InMemoryCredits, InMemoryCrmLinks, InMemoryDisplays, InMemoryInventory,
    InMemoryStores,
};
use activation_backend::outbound::notify::TracingNotifier;

/// Customer API stub: every call fails, proving effect isolation.
struct OutageCrmApi;

#[async_trait]
impl CrmCustomerApi for OutageCrmApi {
    async fn search_by_email(
        &self,
        _endpoint: &CrmEndpoint,
        _email: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }

    async fn fetch(
        &self,
        _endpoint: &CrmEndpoint,
        _id: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }

    async fn create(
        &self,
        _endpoint: &CrmEndpoint,
        _draft: &CrmCustomerDraft,
    ) -> Result<String, CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }

    async fn update(
        &self,
        _endpoint: &CrmEndpoint,
        _id: &str,
        _update: &CrmCustomerUpdate,
    ) -> Result<(), CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }

    async fn read_field(
        &self,
        _endpoint: &CrmEndpoint,
        _id: &str,
        _key: &str,
    ) -> Result<Option<String>, CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }

    async fn write_field(
        &self,
        _endpoint: &CrmEndpoint,
        _id: &str,
        _key: &str,
        _value: &str,
    ) -> Result<(), CrmApiError> {
        Err(CrmApiError::transport("scripted outage"))
    }
}

struct Harness {
    displays: Arc<InMemoryDisplays>,
    stores: Arc<InMemoryStores>,
    inventory: Arc<InMemoryInventory>,
    credits: Arc<InMemoryCredits>,
    service: ActivationService,
}

fn display_id(raw: &str) -> DisplayId {
    DisplayId::new(raw).expect("valid id")
}

fn store_id(raw: &str) -> StoreId {
    StoreId::new(raw).expect("valid id")
}

fn sku(raw: &str) -> Sku {
    Sku::new(raw).expect("valid sku")
}

fn brand(vault: &CredentialVault, with_catalogue: bool) -> BrandAccount {
    let token = vault.encrypt("secret-token").expect("seals");
    BrandAccount {
        id: BrandId::new("B-A").expect("valid id"),
        name: "Acme Samples".to_owned(),
        owner_contact: OwnerContact {
            email: "owner@acme.example".to_owned(),
            phone: Some("4155550199".to_owned()),
        },
        catalogue: if with_catalogue {
            vec![
                Product {
                    sku: sku("SKU-1"),
                    title: "Sampler".to_owned(),
                },
                Product {
                    sku: sku("SKU-2"),
                    title: "Refill".to_owned(),
                },
            ]
        } else {
            vec![]
        },
        crm: Some(CrmCredentials {
            api_base: Url::parse("https://crm.example/api/v2/").expect("valid base"),
            encrypted_token: token,
        }),
    }
}

fn sold_display() -> Display {
    Display {
        id: display_id("D-1"),
        status: DisplayStatus::Sold,
        owning_brand: BrandId::new("B-OWNER").expect("valid id"),
        assigned_brand: Some(BrandId::new("B-A").expect("valid id")),
        store_id: None,
        activated_at: None,
    }
}

fn harness(with_catalogue: bool) -> Harness {
    let secret = MasterSecret::new("test-master-secret").expect("valid secret");
    let vault = CredentialVault::new(secret.clone());

    let displays = Arc::new(InMemoryDisplays::seeded([sold_display()]));
    let stores = Arc::new(InMemoryStores::default());
    let brands = Arc::new(InMemoryBrands::seeded([brand(&vault, with_catalogue)]));
    let inventory = Arc::new(InMemoryInventory::default());
    let credits = Arc::new(InMemoryCredits::default());
    let links = Arc::new(InMemoryCrmLinks::default());

    let crm = Arc::new(CrmSyncService::new(
        Arc::new(OutageCrmApi),
        Arc::new(CredentialVault::new(secret)),
        links.clone(),
        Duration::ZERO,
    ));
    let ports = ActivationPorts {
        displays: displays.clone(),
        stores: stores.clone(),
        brands,
        inventory: inventory.clone(),
        credits: credits.clone(),
        links,
        notifier: Arc::new(TracingNotifier),
    };
    let service = ActivationService::new(ports, crm, ActivationConfig::default());
    Harness {
        displays,
        stores,
        inventory,
        credits,
        service,
    }
}

fn request() -> ActivationRequest {
    ActivationRequest {
        display_id: display_id("D-1"),
        store_name: Some("Corner Market".to_owned()),
        email: "owner@corner.example".to_owned(),
        phone: "4155550100".to_owned(),
        pin: "1234".to_owned(),
        zip: "94107".to_owned(),
        state_code: "CA".to_owned(),
        promo: None,
        followup_days: vec![4, 12],
        sample_skus: vec![sku("SKU-1")],
        product_skus: vec![],
        existing_store_id: None,
        crm_customer_id: None,
        setup_photo_url: None,
        initial_inventory: BTreeMap::from([(
            sku("SKU-1"),
            InventoryTarget {
                quantity: 24,
                is_presale: false,
            },
        )]),
    }
}

#[tokio::test]
async fn create_mode_activation_builds_the_full_record_set() {
    let h = harness(true);
    let outcome = h.service.activate(request()).await.expect("activates");

    assert_eq!(outcome.store_id.as_str(), "S-1");
    assert_eq!(outcome.store_name, "Corner Market");

    let store = h
        .stores
        .find(&store_id("S-1"))
        .await
        .expect("find runs")
        .expect("store created");
    assert_eq!(store.followup_days.as_pair(), (4, 12));
    assert_eq!(store.pin, "1234");

    let display = h
        .displays
        .find(&display_id("D-1"))
        .await
        .expect("find runs")
        .expect("display exists");
    assert_eq!(display.status, DisplayStatus::Active);
    assert_eq!(display.store_id, Some(store_id("S-1")));
    assert!(display.activated_at.is_some());

    let rows = h
        .inventory
        .transactions(&store_id("S-1"))
        .await
        .expect("log reads");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].delta, 24);
    assert_eq!(rows[0].balance_after, 24);
    let level = h
        .inventory
        .level(&store_id("S-1"), &sku("SKU-1"))
        .await
        .expect("level reads")
        .expect("level exists");
    assert_eq!(level.on_hand, 24);
}

#[tokio::test]
async fn crm_and_credit_effects_degrade_without_failing_the_request() {
    let h = harness(true);
    let mut req = request();
    req.crm_customer_id = Some("cust-1".to_owned());
    req.setup_photo_url = Some("https://cdn.example/setup.jpg".to_owned());

    let outcome = h.service.activate(req).await.expect("activates");

    let crm = outcome
        .effects
        .iter()
        .find(|e| e.effect == EffectKind::CrmSync)
        .expect("crm effect reported");
    assert_eq!(crm.status, EffectStatus::Failed);

    let credit = outcome
        .effects
        .iter()
        .find(|e| e.effect == EffectKind::CreditGrant)
        .expect("credit effect reported");
    assert_eq!(credit.status, EffectStatus::Ran);
    assert_eq!(
        h.credits.balance(&store_id("S-1")).await.expect("balance"),
        2_500
    );

    let notify = outcome
        .effects
        .iter()
        .find(|e| e.effect == EffectKind::Notifications)
        .expect("notification effect reported");
    assert_eq!(notify.status, EffectStatus::Ran);
}

#[tokio::test]
async fn exact_retry_after_success_conflicts_with_the_store_id() {
    let h = harness(true);
    h.service.activate(request()).await.expect("first run");

    let err = h
        .service
        .activate(request())
        .await
        .expect_err("retry conflicts");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(
        err.details().expect("details present")["storeId"],
        "S-1"
    );

    // No duplicate rows from the rejected retry.
    let rows = h
        .inventory
        .transactions(&store_id("S-1"))
        .await
        .expect("log reads");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn dangling_store_link_allows_recreation_under_the_same_id() {
    let h = harness(true);
    h.service.activate(request()).await.expect("first run");

    // The store vanishes out of band; the display still points at it.
    h.stores.remove(&store_id("S-1")).expect("remove runs");

    let mut retry = request();
    retry.setup_photo_url = Some("https://cdn.example/setup.jpg".to_owned());
    let outcome = h.service.activate(retry).await.expect("re-entry succeeds");
    assert_eq!(outcome.store_id.as_str(), "S-1");

    let store = h
        .stores
        .find(&store_id("S-1"))
        .await
        .expect("find runs")
        .expect("store recreated");
    assert_eq!(store.name, "Corner Market");
}

#[tokio::test]
async fn setup_credit_is_granted_once_across_reentries() {
    let h = harness(true);
    let mut first = request();
    first.setup_photo_url = Some("https://cdn.example/setup.jpg".to_owned());
    h.service.activate(first).await.expect("first run");

    h.stores.remove(&store_id("S-1")).expect("remove runs");
    let mut retry = request();
    retry.setup_photo_url = Some("https://cdn.example/setup.jpg".to_owned());
    let outcome = h.service.activate(retry).await.expect("re-entry succeeds");

    let credit = outcome
        .effects
        .iter()
        .find(|e| e.effect == EffectKind::CreditGrant)
        .expect("credit effect reported");
    assert_eq!(credit.status, EffectStatus::Skipped);
    assert_eq!(
        h.credits.balance(&store_id("S-1")).await.expect("balance"),
        2_500
    );
    assert_eq!(
        h.credits
            .transactions(&store_id("S-1"))
            .await
            .expect("log reads")
            .len(),
        1
    );
}

#[tokio::test]
async fn link_mode_patches_only_supplied_fields() {
    let h = harness(true);

    // Stand up a store through a first activation, then link a second
    // display to it without a name or promo.
    h.service.activate(request()).await.expect("first run");
    h.displays
        .insert(Display {
            id: display_id("D-2"),
            ..sold_display()
        })
        .expect("insert runs");

    let mut link = request();
    link.display_id = display_id("D-2");
    link.existing_store_id = Some(store_id("S-1"));
    link.store_name = None;
    link.pin = "9876".to_owned();
    link.initial_inventory = BTreeMap::from([(
        sku("SKU-2"),
        InventoryTarget {
            quantity: 6,
            is_presale: true,
        },
    )]);

    let outcome = h.service.activate(link).await.expect("link succeeds");
    assert_eq!(outcome.store_id.as_str(), "S-1");

    let store = h
        .stores
        .find(&store_id("S-1"))
        .await
        .expect("find runs")
        .expect("store exists");
    assert_eq!(store.name, "Corner Market");
    assert_eq!(store.pin, "9876");

    // Verification counts against an existing store use the correction kind.
    let rows = h
        .inventory
        .transactions(&store_id("S-1"))
        .await
        .expect("log reads");
    let correction = rows
        .iter()
        .find(|row| row.sku == sku("SKU-2"))
        .expect("correction row recorded");
    assert_eq!(
        correction.kind,
        activation_backend::domain::InventoryTransactionKind::Correction
    );
    assert_eq!(correction.delta, 6);
}

#[tokio::test]
async fn unknown_display_is_not_found() {
    let h = harness(true);
    let mut req = request();
    req.display_id = display_id("D-404");
    let err = h.service.activate(req).await.expect_err("missing display");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn foreign_sku_is_rejected_when_the_catalogue_is_known() {
    let h = harness(true);
    let mut req = request();
    req.sample_skus = vec![sku("SKU-UNKNOWN")];
    let err = h.service.activate(req).await.expect_err("sku rejected");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn empty_catalogue_skips_the_sku_check() {
    let h = harness(false);
    let mut req = request();
    req.sample_skus = vec![sku("SKU-ANYTHING")];
    req.initial_inventory = BTreeMap::new();
    assert!(h.service.activate(req).await.is_ok());
}

#[tokio::test]
async fn validation_failures_precede_any_mutation() {
    let h = harness(true);
    let mut req = request();
    req.pin = "12".to_owned();
    let err = h.service.activate(req).await.expect_err("validation fails");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);

    let display = h
        .displays
        .find(&display_id("D-1"))
        .await
        .expect("find runs")
        .expect("display exists");
    assert_eq!(display.status, DisplayStatus::Sold);
    assert!(
        h.inventory
            .transactions(&store_id("S-1"))
            .await
            .expect("log reads")
            .is_empty()
    );
}

#[tokio::test]
async fn reactivation_timestamp_is_stamped_at_claim_time() {
    let h = harness(true);
    let before = Utc::now();
    h.service.activate(request()).await.expect("activates");
    let display = h
        .displays
        .find(&display_id("D-1"))
        .await
        .expect("find runs")
        .expect("display exists");
    let at = display.activated_at.expect("stamped");
    assert!(at >= before && at <= Utc::now());
}
