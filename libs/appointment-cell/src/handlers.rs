// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentListQuery, AppointmentSearchQuery, AppointmentStatus, BookAppointmentRequest,
    BulkTransitionRequest, RescheduleAppointmentRequest, TransitionRequest,
};
use crate::services::booking::{AppointmentBookingService, AppointmentScope};
use crate::services::stats::{export_to_csv, AnalyticsService};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_patient() && !user.is_admin() {
        return Err(AppError::Forbidden("Only patients can book appointments".to_string()));
    }

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .book_appointment(&user, request, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully! Waiting for doctor approval."
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .reschedule_appointment(&user, appointment_id, request, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    ensure_can_view(&state, &user, &appointment, auth.token()).await?;

    let history = service
        .get_status_history(appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "status_history": history
    })))
}

// ==============================================================================
// DASHBOARD LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_appointments(
            AppointmentScope::Patient(user.id.clone()),
            &query,
            Utc::now(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_appointments(
            AppointmentScope::Doctor(doctor.id),
            &query,
            Utc::now(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

// ==============================================================================
// STATUS TRANSITIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    // Patients may only cancel their own appointments; doctors manage their
    // own practice; admins pass.
    if user.is_patient() {
        let owns = appointment.user_id.map(|id| id.to_string()) == Some(user.id.clone());
        if !owns {
            return Err(AppError::Forbidden("Permission denied".to_string()));
        }
        if request.status != AppointmentStatus::Cancelled {
            return Err(AppError::Forbidden(
                "Patients can only cancel appointments".to_string(),
            ));
        }
    } else if user.is_doctor() {
        let doctor = require_own_doctor(&state, &user, auth.token()).await?;
        if appointment.doctor_id != doctor.id {
            return Err(AppError::Forbidden("Permission denied".to_string()));
        }
    } else if !user.is_admin() {
        return Err(AppError::Forbidden("Permission denied".to_string()));
    }

    let changed_by = Uuid::parse_str(&user.id).ok();
    let updated = service
        .transition_engine()
        .apply(
            &appointment,
            request.status,
            changed_by,
            request.reason.as_deref(),
            Utc::now(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "new_status": updated.status,
        "message": "Status updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn bulk_update_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BulkTransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    if request.appointment_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Appointment IDs and new status are required".to_string(),
        ));
    }

    let changed_by = Uuid::parse_str(&user.id).ok();
    let service = AppointmentBookingService::new(&state);
    let updated_count = service
        .transition_engine()
        .bulk_apply(
            doctor.id,
            &request.appointment_ids,
            request.status,
            changed_by,
            request.reason.as_deref(),
            Utc::now(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "updated_count": updated_count,
        "message": format!("Successfully updated {} appointments", updated_count)
    })))
}

// ==============================================================================
// SEARCH / EXPORT / ANALYTICS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let scope = resolve_scope(&state, &user, auth.token()).await?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .search_appointments(scope, &query, Some(20), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn export_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let scope = resolve_scope(&state, &user, auth.token()).await?;

    let search = AppointmentSearchQuery {
        q: None,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .search_appointments(scope, &search, None, auth.token())
        .await?;

    match query.format.as_deref().unwrap_or("csv") {
        "csv" => {
            let body = export_to_csv(&appointments);
            let headers = [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"appointments.csv\"".to_string(),
                ),
            ];
            Ok((headers, body).into_response())
        }
        "json" => Ok(Json(json!({ "appointments": appointments })).into_response()),
        other => Err(AppError::BadRequest(format!("Unsupported format: {}", other))),
    }
}

#[axum::debug_handler]
pub async fn analytics_dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_scope = if user.is_admin() {
        None
    } else if user.is_doctor() {
        let doctor = require_own_doctor(&state, &user, auth.token()).await?;
        Some(doctor.id)
    } else {
        return Err(AppError::Forbidden("Permission denied".to_string()));
    };

    let service = AnalyticsService::new(&state);
    let analytics = service
        .analytics(
            doctor_scope,
            query.days.unwrap_or(30),
            Utc::now(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "analytics": analytics
    })))
}

// ==============================================================================
// HELPERS
// ==============================================================================

async fn require_own_doctor(
    config: &AppConfig,
    user: &User,
    token: &str,
) -> Result<doctor_cell::models::Doctor, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Permission denied".to_string()));
    }

    let service = DoctorService::new(config);
    Ok(service.doctor_for_user(&user.id, token).await?)
}

async fn resolve_scope(
    config: &AppConfig,
    user: &User,
    token: &str,
) -> Result<AppointmentScope, AppError> {
    if user.is_admin() {
        Ok(AppointmentScope::All)
    } else if user.is_doctor() {
        let doctor = require_own_doctor(config, user, token).await?;
        Ok(AppointmentScope::Doctor(doctor.id))
    } else {
        Ok(AppointmentScope::Patient(user.id.clone()))
    }
}

async fn ensure_can_view(
    config: &AppConfig,
    user: &User,
    appointment: &crate::models::Appointment,
    token: &str,
) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    if user.is_doctor() {
        let doctor = require_own_doctor(config, user, token).await?;
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
