// ABOUTME: Notification delivery seam
// ABOUTME: Delivery failures are logged and dropped, never surfaced to the triggering operation

use async_trait::async_trait;
use tracing::warn;

use ecflow_storage::StorageError;

use crate::types::NotificationCreateInput;

/// Anything that can accept a notification for delivery
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, input: NotificationCreateInput) -> Result<(), StorageError>;
}

/// Deliver `input`, swallowing (but logging) any failure
pub async fn notify_best_effort(sink: &dyn NotificationSink, input: NotificationCreateInput) {
    let recipient = input.user_id.clone();
    let kind = input.kind;

    if let Err(e) = sink.deliver(input).await {
        warn!(
            recipient = %recipient,
            kind = ?kind,
            error = %e,
            "Failed to deliver notification"
        );
    }
}
