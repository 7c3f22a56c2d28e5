//! Activation API handler.
//!
//! ```text
//! POST /api/v1/activations  Activate a display against a store
//! ```

use std::collections::BTreeMap;

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{DisplayId, IdValidationError, Sku, StoreId};
use crate::domain::activation::{ActivationRequest, EffectOutcome, InventoryTarget};
use crate::domain::store::PromoConfig;
use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Requested quantity for one SKU.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTargetBody {
    /// Absolute quantity to record, not a delta.
    pub quantity: i64,
    /// Marks stock promised but not yet on the shelf.
    #[serde(default)]
    pub is_presale: bool,
}

/// Activation request body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequestBody {
    /// Identifier printed on the physical display unit.
    pub display_id: String,
    /// Required when creating a store; ignored-if-blank when linking.
    #[serde(default)]
    pub store_name: Option<String>,
    pub email: String,
    pub phone: String,
    /// Four-digit store PIN.
    pub pin: String,
    /// Five-digit postal code.
    pub zip: String,
    /// Two-letter uppercase state code.
    pub state_code: String,
    #[serde(default)]
    pub promo: Option<PromoConfig>,
    /// Exactly two follow-up day offsets.
    pub followup_days: Vec<u8>,
    pub sample_skus: Vec<String>,
    #[serde(default)]
    pub product_skus: Vec<String>,
    /// Selects link mode when present.
    #[serde(default)]
    pub existing_store_id: Option<String>,
    #[serde(default)]
    pub crm_customer_id: Option<String>,
    #[serde(default)]
    pub setup_photo_url: Option<String>,
    /// Per-SKU absolute quantities recorded at activation.
    #[serde(default)]
    pub initial_inventory: BTreeMap<String, InventoryTargetBody>,
}

/// Activation response body.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponseBody {
    pub ok: bool,
    /// Store the display is now linked to.
    pub store_id: String,
    pub store_name: String,
    pub message: String,
    /// Per-integration outcome of the best-effort side effects.
    pub effects: Vec<EffectOutcome>,
}

fn map_id_error(err: IdValidationError) -> Error {
    Error::invalid_request(err.to_string())
}

fn parse_skus(raw: &[String]) -> Result<Vec<Sku>, Error> {
    raw.iter()
        .map(|sku| Sku::new(sku.clone()).map_err(map_id_error))
        .collect()
}

impl TryFrom<ActivateRequestBody> for ActivationRequest {
    type Error = Error;

    fn try_from(body: ActivateRequestBody) -> Result<Self, Self::Error> {
        let mut initial_inventory = BTreeMap::new();
        for (sku, target) in body.initial_inventory {
            initial_inventory.insert(
                Sku::new(sku).map_err(map_id_error)?,
                InventoryTarget {
                    quantity: target.quantity,
                    is_presale: target.is_presale,
                },
            );
        }
        Ok(Self {
            display_id: DisplayId::new(body.display_id).map_err(map_id_error)?,
            store_name: body.store_name,
            email: body.email,
            phone: body.phone,
            pin: body.pin,
            zip: body.zip,
            state_code: body.state_code,
            promo: body.promo,
            followup_days: body.followup_days,
            sample_skus: parse_skus(&body.sample_skus)?,
            product_skus: parse_skus(&body.product_skus)?,
            existing_store_id: body
                .existing_store_id
                .map(StoreId::new)
                .transpose()
                .map_err(map_id_error)?,
            crm_customer_id: body.crm_customer_id,
            setup_photo_url: body.setup_photo_url,
            initial_inventory,
        })
    }
}

/// Activate a display against a new or pre-existing store.
///
/// The authoritative mutation (store record, inventory rows, display claim)
/// is all-or-nothing; integration side effects are reported per entry in
/// `effects` and never fail the request.
///
/// # Errors
///
/// - `400 Bad Request`: field validation failed; `details` lists every fault.
/// - `404 Not Found`: unknown display, store, or brand.
/// - `409 Conflict`: the display is already activated; `details.storeId`
///   carries the linked store.
/// - `503 Service Unavailable`: a repository or ledger is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/activations",
    request_body = ActivateRequestBody,
    responses(
        (status = 200, description = "Display activated", body = ActivateResponseBody),
        (status = 400, description = "Invalid request", body = crate::domain::Error),
        (status = 404, description = "Unknown display, store, or brand", body = crate::domain::Error),
        (status = 409, description = "Display already activated", body = crate::domain::Error),
        (status = 503, description = "Service unavailable", body = crate::domain::Error)
    ),
    tags = ["activations"],
    operation_id = "activateDisplay"
)]
#[post("/activations")]
pub async fn activate_display(
    state: web::Data<HttpState>,
    payload: web::Json<ActivateRequestBody>,
) -> ApiResult<HttpResponse> {
    let request = ActivationRequest::try_from(payload.into_inner())?;
    let outcome = state.activation.activate(request).await?;
    let body = ActivateResponseBody {
        ok: true,
        store_id: outcome.store_id.to_string(),
        store_name: outcome.store_name,
        message: outcome.message,
        effects: outcome.effects,
    };
    Ok(HttpResponse::Ok().json(body))
}
