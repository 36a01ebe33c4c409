// libs/doctor-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    /// Owning account. Doctor identity is resolved through this relation,
    /// never by matching a display name against a username.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub consultation_fee: Option<f64>,
    pub experience_years: i32,
    pub description: Option<String>,
    pub affiliation: Option<String>,
    pub license_number: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Weekly availability window. At most one row per (doctor, day_of_week);
/// day_of_week runs 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub max_appointments: i32,
    pub is_available: bool,
}

/// Ad-hoc exclusion window (vacation, meeting). May span multiple days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub consultation_fee: Option<f64>,
    pub experience_years: Option<i32>,
    pub description: Option<String>,
    pub affiliation: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertScheduleRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub max_appointments: Option<i32>,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

/// Why a date yielded no slots at all (as opposed to a fully booked day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotsUnavailableReason {
    /// No schedule row exists for that day of week.
    Unscheduled,
    /// A schedule row exists but is flagged unavailable.
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SlotsUnavailableReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListQuery {
    pub specialization: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Review not found")]
    ReviewNotFound,

    #[error("Blocked interval not found")]
    BlockNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("A completed appointment with this doctor is required to review them")]
    ReviewNotAllowed,

    #[error("You have already reviewed this doctor")]
    DuplicateReview,

    #[error("Unauthorized access to doctor resources")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for shared_models::error::AppError {
    fn from(err: DoctorError) -> Self {
        use shared_models::error::AppError;
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ReviewNotFound => AppError::NotFound("Review not found".to_string()),
            DoctorError::BlockNotFound => {
                AppError::NotFound("Blocked interval not found".to_string())
            }
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::ReviewNotAllowed => AppError::BadRequest(err.to_string()),
            DoctorError::DuplicateReview => AppError::Conflict(err.to_string()),
            DoctorError::Unauthorized => AppError::Forbidden(err.to_string()),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
