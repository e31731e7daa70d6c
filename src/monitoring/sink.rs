//! Notification transport contract

use async_trait::async_trait;

use crate::monitoring::formatter::NotificationPayload;
use crate::utils::SinkError;

/// Delivers one notification; a single attempt, retries happen in the dispatcher
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError>;
}
