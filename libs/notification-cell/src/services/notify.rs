use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Notification, NotificationError, NotificationType};

pub struct NotificationService {
    supabase: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: i64,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Record an in-app notification for a user. Callers on the booking
    /// and transition paths treat this as fire-and-forget and only log a
    /// failure.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        title: &str,
        message: &str,
        appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        debug!("Creating {} notification for user {}", kind, user_id);

        let body = json!({
            "user_id": user_id,
            "appointment_id": appointment_id,
            "type": kind,
            "title": title,
            "message": message,
            "is_read": false,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| NotificationError::DatabaseError("Failed to create notification".to_string()))
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    NotificationError::DatabaseError(format!("Failed to parse notification: {}", e))
                })
            })
    }

    /// Most recent notifications for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: i32,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&order=created_at.desc&limit={}",
            user_id, limit
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Notification>, _>>()
            .map_err(|e| {
                NotificationError::DatabaseError(format!("Failed to parse notifications: {}", e))
            })
    }

    pub async fn unread_count(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<i64, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&is_read=eq.false&select=count",
            user_id
        );
        let result: Vec<CountRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(result.first().map(|r| r.count).unwrap_or(0))
    }

    /// Mark one notification read; scoped to the owner.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&user_id=eq.{}",
            notification_id, user_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_read": true })),
                Some(headers),
            )
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_all_read(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&is_read=eq.false",
            user_id
        );
        let _: Vec<Value> = self
            .supabase
            .request(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_read": true })),
            )
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
