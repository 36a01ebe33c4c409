// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::services::notify::NotificationService;

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub limit: Option<i32>,
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let notifications = service
        .list_for_user(&user.id, query.limit.unwrap_or(10), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "notifications": notifications
    })))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let count = service.unread_count(&user.id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "unread": count
    })))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<Arc<AppConfig>>,
    Path(notification_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    service
        .mark_read(notification_id, &user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification marked as read"
    })))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    service.mark_all_read(&user.id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "All notifications marked as read"
    })))
}
