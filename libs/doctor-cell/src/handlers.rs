// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateBlockRequest, CreateReviewRequest, DoctorListQuery, SlotQuery,
    UpdateDoctorProfileRequest, UpdateReviewRequest, UpsertScheduleRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::doctor::DoctorService;
use crate::services::review::ReviewService;
use crate::services::schedule::ScheduleService;

// ==============================================================================
// DOCTOR DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctors = service
        .list_doctors(query.specialization.as_deref(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors can update a doctor profile".to_string()));
    }

    let service = DoctorService::new(&state);
    let doctor = service.doctor_for_user(&user.id, auth.token()).await?;
    let updated = service
        .update_profile(doctor.id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctor": updated
    })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let response = service
        .get_available_slots(doctor_id, query.date, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": response
    })))
}

#[axum::debug_handler]
pub async fn get_my_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = ScheduleService::new(&state);
    let week = service.get_week(doctor.id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "schedule": week
    })))
}

#[axum::debug_handler]
pub async fn upsert_schedule_day(
    State(state): State<Arc<AppConfig>>,
    Path(day_of_week): Path<i32>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = ScheduleService::new(&state);
    let schedule = service
        .upsert_day(doctor.id, day_of_week, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn list_my_blocks(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = ScheduleService::new(&state);
    let blocks = service.list_blocks(doctor.id, Utc::now(), auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "blocks": blocks
    })))
}

#[axum::debug_handler]
pub async fn add_block(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = ScheduleService::new(&state);
    let block = service.add_block(doctor.id, request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "block": block
    })))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor = require_own_doctor(&state, &user, auth.token()).await?;

    let service = ScheduleService::new(&state);
    service.delete_block(doctor.id, block_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked interval removed"
    })))
}

// ==============================================================================
// REVIEW HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_review(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden("Only patients can leave reviews".to_string()));
    }

    let service = ReviewService::new(&state);
    let review = service
        .add_review(doctor_id, &user.id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "review": review,
        "message": "Review submitted successfully! It will be visible after approval."
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_reviews(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ReviewService::new(&state);
    let reviews = service.list_for_doctor(doctor_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "reviews": reviews
    })))
}

#[axum::debug_handler]
pub async fn edit_review(
    State(state): State<Arc<AppConfig>>,
    Path(review_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReviewService::new(&state);
    let review = service
        .edit_review(review_id, &user.id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "review": review
    })))
}

#[axum::debug_handler]
pub async fn approve_review(
    State(state): State<Arc<AppConfig>>,
    Path(review_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can approve reviews".to_string()));
    }

    let service = ReviewService::new(&state);
    let review = service.approve_review(review_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "review": review
    })))
}

#[axum::debug_handler]
pub async fn my_reviews(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReviewService::new(&state);
    let reviews = service.reviews_by_patient(&user.id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "reviews": reviews
    })))
}

// ==============================================================================
// HELPERS
// ==============================================================================

async fn require_own_doctor(
    config: &AppConfig,
    user: &User,
    token: &str,
) -> Result<crate::models::Doctor, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors can manage availability".to_string()));
    }

    let service = DoctorService::new(config);
    Ok(service.doctor_for_user(&user.id, token).await?)
}
