// libs/notification-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AppointmentCreated,
    StatusChanged,
    AppointmentReminder,
    AppointmentCancelled,
    AppointmentRescheduled,
    System,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::AppointmentCreated => write!(f, "appointment_created"),
            NotificationType::StatusChanged => write!(f, "status_changed"),
            NotificationType::AppointmentReminder => write!(f, "appointment_reminder"),
            NotificationType::AppointmentCancelled => write!(f, "appointment_cancelled"),
            NotificationType::AppointmentRescheduled => write!(f, "appointment_rescheduled"),
            NotificationType::System => write!(f, "system"),
        }
    }
}

/// Outbound email payload handed to the mail API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Mail delivery failed: {0}")]
    MailDeliveryFailed(String),

    #[error("Mail client not configured")]
    MailNotConfigured,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<NotificationError> for shared_models::error::AppError {
    fn from(err: NotificationError) -> Self {
        use shared_models::error::AppError;
        match err {
            NotificationError::NotFound => {
                AppError::NotFound("Notification not found".to_string())
            }
            NotificationError::MailDeliveryFailed(msg) => AppError::ExternalService(msg),
            NotificationError::MailNotConfigured => {
                AppError::ExternalService("Mail client not configured".to_string())
            }
            NotificationError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
