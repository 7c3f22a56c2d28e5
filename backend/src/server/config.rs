//! HTTP server configuration sourced from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use activation_backend::domain::MasterSecret;
use activation_backend::domain::vault::MasterSecretError;

/// Environment variable holding the vault master secret.
pub const MASTER_SECRET_VAR: &str = "ACTIVATION_MASTER_SECRET";
/// Environment variable overriding the bind address.
pub const BIND_ADDR_VAR: &str = "ACTIVATION_BIND_ADDR";
/// Environment variable overriding the per-effect deadline, in milliseconds.
pub const EFFECT_TIMEOUT_VAR: &str = "ACTIVATION_EFFECT_TIMEOUT_MS";
/// Environment variable overriding the inter-brand CRM pause, in milliseconds.
pub const CRM_PAUSE_VAR: &str = "ACTIVATION_CRM_PAUSE_MS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_EFFECT_TIMEOUT: Duration = Duration::from_millis(5_000);
const DEFAULT_CRM_PAUSE: Duration = Duration::from_millis(500);

/// Failure to assemble a runnable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The vault master secret is missing or blank; the service cannot
    /// decrypt any brand credential without it.
    #[error(transparent)]
    MasterSecret(#[from] MasterSecretError),
    /// The bind address override does not parse as `host:port`.
    #[error("{BIND_ADDR_VAR} is not a valid socket address: {0}")]
    BindAddr(String),
    /// A millisecond override does not parse as an integer.
    #[error("{var} is not a valid millisecond count: {value}")]
    Milliseconds { var: &'static str, value: String },
}

/// Runtime configuration for the activation server.
pub struct ServerConfig {
    pub master_secret: MasterSecret,
    pub bind_addr: SocketAddr,
    pub effect_timeout: Duration,
    pub crm_pause: Duration,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when the master secret is absent or an override is malformed;
    /// the server refuses to start rather than run with a broken vault.
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_secret = MasterSecret::from_env(MASTER_SECRET_VAR)?;
        let bind_addr = std::env::var(BIND_ADDR_VAR)
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned())
            .parse()
            .map_err(|_| {
                ConfigError::BindAddr(std::env::var(BIND_ADDR_VAR).unwrap_or_default())
            })?;
        let effect_timeout = millis_from_env(EFFECT_TIMEOUT_VAR, DEFAULT_EFFECT_TIMEOUT)?;
        let crm_pause = millis_from_env(CRM_PAUSE_VAR, DEFAULT_CRM_PAUSE)?;
        Ok(Self {
            master_secret,
            bind_addr,
            effect_timeout,
            crm_pause,
        })
    }
}

fn millis_from_env(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Milliseconds { var, value }),
        Err(_) => Ok(default),
    }
}
