//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::ActivationCommand;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub activation: Arc<dyn ActivationCommand>,
}

impl HttpState {
    /// Construct state over the activation use case.
    pub fn new(activation: Arc<dyn ActivationCommand>) -> Self {
        Self { activation }
    }
}
