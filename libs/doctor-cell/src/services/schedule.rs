use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BlockedInterval, CreateBlockRequest, DoctorError, UpsertScheduleRequest, WeeklySchedule};

pub struct ScheduleService {
    supabase: SupabaseClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch the doctor's full weekly schedule, ordered by day.
    pub async fn get_week(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<WeeklySchedule>, DoctorError> {
        let path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&order=day_of_week.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WeeklySchedule>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse schedules: {}", e)))
    }

    /// Create or replace the schedule row for one day of the week.
    /// One row per (doctor, day_of_week) is an invariant.
    pub async fn upsert_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
        request: UpsertScheduleRequest,
        auth_token: &str,
    ) -> Result<WeeklySchedule, DoctorError> {
        debug!("Upserting schedule for doctor {} day {}", doctor_id, day_of_week);

        if !(0..=6).contains(&day_of_week) {
            return Err(DoctorError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if request.start_time >= request.end_time {
            return Err(DoctorError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }
        if request.slot_duration_minutes <= 0 {
            return Err(DoctorError::ValidationError(
                "Slot duration must be positive".to_string(),
            ));
        }

        let existing_path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&day_of_week=eq.{}",
            doctor_id, day_of_week
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let body = json!({
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "slot_duration_minutes": request.slot_duration_minutes,
            "max_appointments": request.max_appointments.unwrap_or(8),
            "is_available": request.is_available,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = if existing.is_empty() {
            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/weekly_schedules",
                    Some(auth_token),
                    Some(body),
                    Some(headers),
                )
                .await
                .map_err(|e| DoctorError::DatabaseError(e.to_string()))?
        } else {
            self.supabase
                .request_with_headers(
                    Method::PATCH,
                    &existing_path,
                    Some(auth_token),
                    Some(body),
                    Some(headers),
                )
                .await
                .map_err(|e| DoctorError::DatabaseError(e.to_string()))?
        };

        let row = result.into_iter().next().ok_or_else(|| {
            DoctorError::DatabaseError("Failed to upsert schedule".to_string())
        })?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse schedule: {}", e)))
    }

    /// Blocked intervals that have not yet ended, soonest first.
    pub async fn list_blocks(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<BlockedInterval>, DoctorError> {
        let path = format!(
            "/rest/v1/blocked_intervals?doctor_id=eq.{}&end_at=gte.{}&order=start_at.asc",
            doctor_id,
            now.to_rfc3339()
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BlockedInterval>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse blocks: {}", e)))
    }

    pub async fn add_block(
        &self,
        doctor_id: Uuid,
        request: CreateBlockRequest,
        auth_token: &str,
    ) -> Result<BlockedInterval, DoctorError> {
        debug!("Adding blocked interval for doctor {}", doctor_id);

        if request.start_at >= request.end_at {
            return Err(DoctorError::ValidationError(
                "Block start must be before block end".to_string(),
            ));
        }

        let body = json!({
            "doctor_id": doctor_id,
            "start_at": request.start_at.to_rfc3339(),
            "end_at": request.end_at.to_rfc3339(),
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339(),
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
                "/rest/v1/blocked_intervals",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            DoctorError::DatabaseError("Failed to create blocked interval".to_string())
        })?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse block: {}", e)))
    }

    /// Delete a block; scoped to the owning doctor so one doctor cannot
    /// remove another's blocks.
    pub async fn delete_block(
        &self,
        doctor_id: Uuid,
        block_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let path = format!(
            "/rest/v1/blocked_intervals?id=eq.{}&doctor_id=eq.{}",
            block_id, doctor_id
        );
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
