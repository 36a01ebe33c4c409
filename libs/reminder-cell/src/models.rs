// libs/reminder-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Email,
    Sms,
    Both,
}

impl ReminderChannel {
    pub fn includes_email(&self) -> bool {
        matches!(self, ReminderChannel::Email | ReminderChannel::Both)
    }
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Email => write!(f, "email"),
            ReminderChannel::Sms => write!(f, "sms"),
            ReminderChannel::Both => write!(f, "both"),
        }
    }
}

/// A reminder is sent at most once: the sweep only ever picks up
/// `is_sent = false` rows and flips the flag on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub channel: ReminderChannel,
    pub hours_before: f64,
    pub scheduled_for: DateTime<Utc>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_via: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderRequest {
    pub appointment_id: Uuid,
    #[serde(default = "default_channel")]
    pub channel: ReminderChannel,
    #[serde(default = "default_hours_before")]
    pub hours_before: f64,
}

fn default_channel() -> ReminderChannel {
    ReminderChannel::Email
}

fn default_hours_before() -> f64 {
    24.0
}

/// Result of one due-reminder sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReminderError {
    #[error("Reminder not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to reminder")]
    Unauthorized,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ReminderError> for shared_models::error::AppError {
    fn from(err: ReminderError) -> Self {
        use shared_models::error::AppError;
        match err {
            ReminderError::NotFound => AppError::NotFound("Reminder not found".to_string()),
            ReminderError::AppointmentNotFound => {
                AppError::NotFound("Appointment not found".to_string())
            }
            ReminderError::ValidationError(msg) => AppError::ValidationError(msg),
            ReminderError::Unauthorized => AppError::Forbidden(err.to_string()),
            ReminderError::DeliveryFailed(msg) => AppError::ExternalService(msg),
            ReminderError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
