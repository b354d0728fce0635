//! Mock Notification Sender Implementation
//!
//! Provides in-memory capture of notifications for testing without external
//! dependencies. Can also be switched into a failing mode to exercise callers
//! that must tolerate delivery errors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{NotificationMessage, NotificationReceipt, NotificationSender, NotifyError};

/// Notification captured by the mock sender
#[derive(Debug, Clone)]
pub struct CapturedNotification {
    pub message: NotificationMessage,
    pub receipt: NotificationReceipt,
    pub captured_at: DateTime<Utc>,
}

impl CapturedNotification {
    /// Challenge id recorded in the notification metadata
    pub fn challenge_id(&self) -> Option<Uuid> {
        self.message
            .metadata
            .get("challenge_id")
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// Mock notification sender for testing
#[derive(Debug, Clone)]
pub struct MockNotificationSender {
    messages: Arc<Mutex<Vec<CapturedNotification>>>,
    by_recipient: Arc<Mutex<HashMap<String, Vec<CapturedNotification>>>>,
    enabled: bool,
    failing: bool,
}

impl MockNotificationSender {
    /// Create a new mock sender
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            by_recipient: Arc::new(Mutex::new(HashMap::new())),
            enabled: true,
            failing: false,
        }
    }

    /// Create a disabled mock sender that acknowledges without capturing
    pub fn new_disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Create a mock sender whose every delivery fails
    pub fn new_failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Get all captured notifications
    pub fn get_all_messages(&self) -> Vec<CapturedNotification> {
        self.messages.lock().unwrap().clone()
    }

    /// Get notifications sent to a specific recipient
    pub fn get_messages_for_recipient(&self, recipient: &str) -> Vec<CapturedNotification> {
        self.by_recipient
            .lock()
            .unwrap()
            .get(recipient)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the most recent fight call for a recipient
    pub fn get_latest_fight_call(&self, recipient: &str) -> Option<CapturedNotification> {
        self.get_messages_for_recipient(recipient)
            .into_iter()
            .filter(|n| {
                n.message
                    .metadata
                    .get("notification_type")
                    .map(|t| t == "fight_call")
                    .unwrap_or(false)
            })
            .max_by_key(|n| n.captured_at)
    }

    /// Check if a fight call was sent to a specific recipient
    pub fn was_fight_call_sent_to(&self, recipient: &str) -> bool {
        self.get_latest_fight_call(recipient).is_some()
    }

    /// Get count of captured notifications
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Clear all captured notifications
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
        self.by_recipient.lock().unwrap().clear();
    }

    /// Check if delivery is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send(&self, message: NotificationMessage) -> Result<NotificationReceipt, NotifyError> {
        if self.failing {
            tracing::warn!("Mock notification sender configured to fail");
            return Err(NotifyError::Delivery(format!(
                "mock delivery to {} failed",
                message.to
            )));
        }

        if !self.enabled {
            tracing::warn!("Mock notification sender disabled, skipping send");
            return Ok(NotificationReceipt {
                message_id: format!("disabled-{}", Uuid::new_v4()),
                sent_at: Utc::now(),
                provider: "mock-disabled".to_string(),
                metadata: message.metadata.clone(),
            });
        }

        message.validate()?;

        tracing::info!("Mock notification sender capturing message to: {}", message.to);

        let receipt = NotificationReceipt {
            message_id: format!("mock-{}", Uuid::new_v4()),
            sent_at: Utc::now(),
            provider: "mock".to_string(),
            metadata: message.metadata.clone(),
        };

        let captured = CapturedNotification {
            message: message.clone(),
            receipt: receipt.clone(),
            captured_at: Utc::now(),
        };

        self.messages.lock().unwrap().push(captured.clone());

        self.by_recipient
            .lock()
            .unwrap()
            .entry(message.to)
            .or_default()
            .push(captured);

        Ok(receipt)
    }

    fn default_from(&self) -> String {
        crate::content::DEFAULT_FROM_ADDRESS.to_string()
    }
}
