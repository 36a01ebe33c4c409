use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use crate::models::AppointmentError;

/// Gates appointment creation and reschedule against the live-slot
/// uniqueness invariant: at most one appointment in a live status per
/// (doctor, date, time). The partial unique index in the datastore is the
/// backstop for the race between this check and the subsequent write.
pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Fails with `SlotTaken` when a live-status appointment already holds
    /// the slot. `exclude_appointment_id` is the appointment being moved in
    /// a reschedule, so it never collides with itself. No booking is
    /// created here; this only gates the create/update.
    pub async fn ensure_slot_free(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Checking slot {} {} for doctor {} (excluding {:?})",
            date, time, doctor_id, exclude_appointment_id
        );

        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("appointment_date=eq.{}", date),
            format!("appointment_time=eq.{}", time.format("%H:%M:%S")),
            "status=in.(pending,approved,scheduled)".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&select=id&limit=1",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if !result.is_empty() {
            warn!(
                "Slot collision for doctor {} at {} {}",
                doctor_id, date, time
            );
            return Err(AppointmentError::SlotTaken);
        }

        Ok(())
    }
}
