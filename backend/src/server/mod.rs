//! Server construction and wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use activation_backend::domain::activation::{
    ActivationConfig, ActivationPorts, ActivationService,
};
use activation_backend::domain::crm::CrmSyncService;
use activation_backend::domain::vault::CredentialVault;
use activation_backend::inbound::http::activation::activate_display;
use activation_backend::inbound::http::health::{HealthState, live, ready};
use activation_backend::inbound::http::state::HttpState;
use activation_backend::outbound::crm::CrmHttpApi;
use activation_backend::outbound::memory::{
    InMemoryBrands, InMemoryCredits, InMemoryCrmLinks, InMemoryDisplays, InMemoryInventory,
    InMemoryStores,
};
use activation_backend::outbound::notify::TracingNotifier;

/// Assemble the activation use case over the outbound adapters.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the HTTP client for the customer API
/// cannot be constructed.
pub fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let vault = Arc::new(CredentialVault::new(config.master_secret.clone()));
    let crm_api = Arc::new(
        CrmHttpApi::new()
            .map_err(|err| std::io::Error::other(format!("crm client construction failed: {err}")))?,
    );
    let links = Arc::new(InMemoryCrmLinks::default());
    let crm = Arc::new(CrmSyncService::new(
        crm_api,
        vault,
        links.clone(),
        config.crm_pause,
    ));

    let ports = ActivationPorts {
        displays: Arc::new(InMemoryDisplays::default()),
        stores: Arc::new(InMemoryStores::default()),
        brands: Arc::new(InMemoryBrands::default()),
        inventory: Arc::new(InMemoryInventory::default()),
        credits: Arc::new(InMemoryCredits::default()),
        links,
        notifier: Arc::new(TracingNotifier),
    };
    let activation = ActivationService::new(
        ports,
        crm,
        ActivationConfig {
            effect_timeout: config.effect_timeout,
            ..ActivationConfig::default()
        },
    );
    Ok(HttpState::new(Arc::new(activation)))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .service(web::scope("/api/v1").service(activate_display))
        .service(ready)
        .service(live)
}

/// Bind and run the HTTP server until shutdown.
///
/// # Errors
///
/// Returns [`std::io::Error`] when state construction or binding fails.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let http_state = web::Data::new(build_http_state(&config)?);
    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(config.bind_addr)?;

    info!(addr = %config.bind_addr, "activation backend listening");
    health_state.mark_ready();
    server.run().await
}
