use crate::domain::notification::Notification;
use crate::domain::ports::NotificationSinkRef;
use std::sync::Arc;
use tracing::{debug, warn};

/// Addresses notifications to the configured host recipient.
#[derive(Clone)]
pub struct Notifier {
    recipient: Arc<str>,
    sink: NotificationSinkRef,
}

impl Notifier {
    pub fn new(recipient: &str, sink: NotificationSinkRef) -> Self {
        Self {
            recipient: Arc::from(recipient),
            sink,
        }
    }

    /// Delivers on the current task. Sink failures are logged and dropped.
    pub async fn notify(&self, notification: Notification) {
        debug!(recipient = %self.recipient, %notification, "notifying host");
        if let Err(e) = self
            .sink
            .send(&self.recipient, notification.method(), &notification.encode())
            .await
        {
            warn!(recipient = %self.recipient, %notification, error = %e, "notification dropped");
        }
    }

    /// Delivers from a spawned task, off the caller's context.
    pub fn notify_deferred(&self, notification: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(notification).await;
        });
    }
}
