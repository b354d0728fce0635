//! Taskogotchi Notification Service
//!
//! Delivers player-facing notifications, currently the "fight call" sent to an
//! opponent when a new fight challenge is created:
//! - Structured-log delivery for deployments without a mail transport
//! - Mock sender for testing and development
//! - Shared fight call templates

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidateEmail;

pub mod content;
pub mod logger;
pub mod mock;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification configuration error: {0}")]
    Configuration(String),

    #[error("Notification validation error: {0}")]
    Validation(String),

    #[error("Notification delivery error: {0}")]
    Delivery(String),
}

/// Notification message to be delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl NotificationMessage {
    /// Create a new notification message
    pub fn new(to: String, from: String, subject: String, body_text: String) -> Self {
        Self {
            to,
            from,
            subject,
            body_text,
            body_html: None,
            metadata: HashMap::new(),
        }
    }

    /// Add HTML body content
    pub fn with_html(mut self, body_html: String) -> Self {
        self.body_html = Some(body_html);
        self
    }

    /// Add metadata for tracking
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Reject messages that no transport could deliver
    pub fn validate(&self) -> Result<(), NotifyError> {
        if !self.to.validate_email() {
            return Err(NotifyError::Validation(format!(
                "Invalid recipient address: {}",
                self.to
            )));
        }
        if self.subject.trim().is_empty() {
            return Err(NotifyError::Validation("Subject is required".to_string()));
        }
        Ok(())
    }
}

/// Notification delivery receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
    pub provider: String,
    pub metadata: HashMap<String, String>,
}

/// Details of a freshly created fight challenge, as seen by the opponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FightCall {
    pub challenge_id: Uuid,
    pub initiator_name: Option<String>,
    pub initiator_email: Option<String>,
    pub project_name: Option<String>,
    pub opponent_email: Option<String>,
}

impl FightCall {
    /// Display name for the challenger, falling back to their email
    pub fn challenger_label(&self) -> &str {
        self.initiator_name
            .as_deref()
            .or(self.initiator_email.as_deref())
            .unwrap_or("another player")
    }
}

/// Notification service configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Delivery provider (log, mock)
    pub provider: String,
    /// Default from address
    pub default_from: String,
    /// Enable delivery (can disable for testing)
    pub enabled: bool,
}

impl NotifierConfig {
    /// Create notifier config from environment variables
    pub fn from_env() -> Result<Self, NotifyError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("NOTIFY_PROVIDER").unwrap_or_else(|_| "log".to_string());

        let default_from = std::env::var("NOTIFY_FROM")
            .unwrap_or_else(|_| content::DEFAULT_FROM_ADDRESS.to_string());

        let enabled = std::env::var("NOTIFY_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            provider,
            default_from,
            enabled,
        })
    }
}

/// Notification sender trait for different implementations
#[async_trait::async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a notification message
    async fn send(&self, message: NotificationMessage) -> Result<NotificationReceipt, NotifyError>;

    /// Return the default "from" address for outgoing notifications
    fn default_from(&self) -> String;

    /// Send the "you were challenged" notification to the opponent.
    ///
    /// Returns `Ok(None)` when the opponent has no address to notify.
    async fn send_fight_call(
        &self,
        call: &FightCall,
    ) -> Result<Option<NotificationReceipt>, NotifyError> {
        let Some(recipient) = call.opponent_email.as_deref() else {
            tracing::debug!(challenge_id = %call.challenge_id, "Opponent has no email, skipping fight call");
            return Ok(None);
        };

        let message = NotificationMessage::new(
            recipient.to_string(),
            self.default_from(),
            content::FIGHT_CALL_SUBJECT.to_string(),
            content::fight_call_text(call),
        )
        .with_html(content::fight_call_html(call))
        .with_metadata("notification_type".to_string(), "fight_call".to_string())
        .with_metadata("challenge_id".to_string(), call.challenge_id.to_string());

        self.send(message).await.map(Some)
    }
}

/// Notification sender factory
pub struct NotifierFactory;

impl NotifierFactory {
    /// Create a notification sender based on configuration
    pub fn create(config: NotifierConfig) -> Result<Box<dyn NotificationSender>, NotifyError> {
        if !config.enabled {
            tracing::info!("Notifications disabled, using disabled mock implementation");
            return Ok(Box::new(mock::MockNotificationSender::new_disabled()));
        }

        match config.provider.as_str() {
            "log" => {
                tracing::info!("Creating log notification sender");
                Ok(Box::new(logger::LogNotificationSender::new(config.default_from)))
            }
            "mock" => {
                tracing::info!("Creating mock notification sender");
                Ok(Box::new(mock::MockNotificationSender::new()))
            }
            provider => Err(NotifyError::Configuration(format!(
                "Unknown notification provider: {}. Supported providers: log, mock",
                provider
            ))),
        }
    }
}
