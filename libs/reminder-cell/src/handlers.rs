// libs/reminder-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::Appointment;
use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CreateReminderRequest;
use crate::services::reminder::ReminderService;

#[axum::debug_handler]
pub async fn create_reminder(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&state);
    let appointment = service
        .get_appointment(request.appointment_id, auth.token())
        .await?;
    ensure_can_manage(&state, &user, &appointment, auth.token()).await?;

    let reminder = service.create_reminder(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "reminder": reminder,
        "message": "Reminder added successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_reminder(
    State(state): State<Arc<AppConfig>>,
    Path(reminder_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&state);
    let reminder = service.get_reminder(reminder_id, auth.token()).await?;
    let appointment = service
        .get_appointment(reminder.appointment_id, auth.token())
        .await?;
    ensure_can_manage(&state, &user, &appointment, auth.token()).await?;

    service.delete_reminder(reminder_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Reminder removed"
    })))
}

#[axum::debug_handler]
pub async fn list_appointment_reminders(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&state);
    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await?;
    ensure_can_manage(&state, &user, &appointment, auth.token()).await?;

    let reminders = service
        .list_for_appointment(appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "reminders": reminders
    })))
}

/// Externally triggered sweep (cron hits this endpoint). Single-instance:
/// two concurrent sweeps could both attempt the same reminder before
/// either marks it sent.
#[axum::debug_handler]
pub async fn run_due_reminders(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can run the reminder sweep".to_string()));
    }

    let service = ReminderService::new(&state);
    let outcome = service.run_due_reminders(Utc::now(), auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "outcome": outcome
    })))
}

async fn ensure_can_manage(
    config: &AppConfig,
    user: &User,
    appointment: &Appointment,
    token: &str,
) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    if user.is_doctor() {
        let service = DoctorService::new(config);
        let doctor = service.doctor_for_user(&user.id, token).await?;
        if appointment.doctor_id == doctor.id {
            return Ok(());
        }
        return Err(AppError::Forbidden("Permission denied".to_string()));
    }
    let owns = appointment.user_id.map(|id| id.to_string()) == Some(user.id.clone());
    if owns {
        Ok(())
    } else {
        Err(AppError::Forbidden("Permission denied".to_string()))
    }
}
