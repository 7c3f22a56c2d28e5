//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for
//! the REST API: the activation endpoint, health probes, and the error and
//! effect-report schemas.

use utoipa::OpenApi;

use crate::domain::activation::{EffectKind, EffectOutcome, EffectStatus};
use crate::domain::{Error, ErrorCode};
use crate::inbound::http::activation::{
    ActivateRequestBody, ActivateResponseBody, InventoryTargetBody,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Activation backend API",
        description = "HTTP interface for display activation and health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::activation::activate_display,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ActivateRequestBody,
        ActivateResponseBody,
        InventoryTargetBody,
        EffectKind,
        EffectOutcome,
        EffectStatus,
        Error,
        ErrorCode,
    )),
    tags(
        (name = "activations", description = "Display activation"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
