//! Structured-log notification sender
//!
//! Emits every notification as a `tracing` event instead of handing it to a
//! mail transport. Deployments route these events to whatever delivery
//! pipeline consumes the service logs.

use chrono::Utc;
use uuid::Uuid;

use crate::{NotificationMessage, NotificationReceipt, NotificationSender, NotifyError};

pub struct LogNotificationSender {
    default_from: String,
}

impl LogNotificationSender {
    pub fn new(default_from: String) -> Self {
        Self { default_from }
    }
}

#[async_trait::async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, message: NotificationMessage) -> Result<NotificationReceipt, NotifyError> {
        message.validate()?;

        let message_id = format!("log-{}", Uuid::new_v4());
        tracing::info!(
            message_id = %message_id,
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.body_text,
            "Notification dispatched"
        );

        Ok(NotificationReceipt {
            message_id,
            sent_at: Utc::now(),
            provider: "log".to_string(),
            metadata: message.metadata,
        })
    }

    fn default_from(&self) -> String {
        self.default_from.clone()
    }
}
