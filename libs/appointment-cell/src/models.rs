// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub doctor_id: Uuid,
    /// Booking account, when the patient was signed in.
    pub user_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub priority: AppointmentPriority,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.appointment_date.and_time(self.appointment_time).and_utc()
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at() > now
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        !self.is_upcoming(now)
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.is_live()
    }

    pub fn can_be_rescheduled(&self) -> bool {
        self.status.is_live()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
    Rejected,
}

impl AppointmentStatus {
    /// Statuses that occupy a slot. The conflict check and the partial
    /// unique index both key off this set.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Approved | AppointmentStatus::Scheduled
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
                | AppointmentStatus::Rejected
        )
    }

    pub fn live_statuses() -> [AppointmentStatus; 3] {
        [
            AppointmentStatus::Pending,
            AppointmentStatus::Approved,
            AppointmentStatus::Scheduled,
        ]
    }

    /// The enforced transition graph. `Rescheduled` is re-entrant: a
    /// rescheduled appointment immediately resumes `Scheduled` at its new
    /// slot, or is cancelled.
    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Approved,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Approved => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
                AppointmentStatus::Rescheduled,
            ],
            AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow
            | AppointmentStatus::Rejected => vec![],
        }
    }

    pub fn all() -> [AppointmentStatus; 8] {
        [
            AppointmentStatus::Pending,
            AppointmentStatus::Approved,
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
            AppointmentStatus::Rejected,
        ]
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for AppointmentPriority {
    fn default() -> Self {
        AppointmentPriority::Normal
    }
}

impl fmt::Display for AppointmentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentPriority::Low => write!(f, "low"),
            AppointmentPriority::Normal => write!(f, "normal"),
            AppointmentPriority::High => write!(f, "high"),
            AppointmentPriority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Append-only transition log. Rows are created once per transition and
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub old_status: Option<AppointmentStatus>,
    pub new_status: AppointmentStatus,
    pub changed_by: Option<Uuid>,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub reason: Option<String>,
    #[serde(default)]
    pub priority: AppointmentPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkTransitionRequest {
    pub appointment_ids: Vec<Uuid>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub q: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub upcoming: Option<bool>,
}

// ==============================================================================
// ANALYTICS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_appointments: i64,
    pub completed_appointments: i64,
    pub cancelled_appointments: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTrendPoint {
    pub date: NaiveDate,
    pub appointments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopDoctor {
    pub doctor_id: Uuid,
    pub name: String,
    pub specialization: String,
    pub appointment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub period: AnalyticsPeriod,
    pub overview: AnalyticsOverview,
    pub status_distribution: Vec<(AppointmentStatus, i64)>,
    pub priority_distribution: Vec<(AppointmentPriority, i64)>,
    pub daily_trends: Vec<DailyTrendPoint>,
    pub top_doctors: Vec<TopDoctor>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::error::AppError;
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            AppointmentError::SlotTaken => AppError::Conflict(
                "This time slot is already booked. Please choose another time.".to_string(),
            ),
            AppointmentError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
