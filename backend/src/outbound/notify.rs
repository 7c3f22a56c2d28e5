//! Structured-log notification dispatcher.
//!
//! Channel providers render templates outside this subsystem; this adapter
//! records the hand-off so sends are observable in development and tests
//! without a provider account.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{Notification, NotificationDispatcher, NotifyError};

/// Dispatcher that emits each send as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationDispatcher for TracingNotifier {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            channel = ?notification.channel,
            kind = ?notification.kind,
            recipient = %notification.recipient,
            "notification dispatched"
        );
        Ok(())
    }
}
