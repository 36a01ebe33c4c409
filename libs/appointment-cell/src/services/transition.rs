use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use std::sync::Arc;

use doctor_cell::services::doctor::DoctorService;
use notification_cell::models::NotificationType;
use notification_cell::services::mailer::MailerClient;
use notification_cell::services::notify::NotificationService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::emails;

/// The status transition engine. The status update and its history record
/// are the core of a transition; the notification and email that follow
/// are best-effort side effects and never fail the transition. All side
/// effects are explicit steps here; nothing reacts to saves implicitly.
pub struct StatusTransitionEngine {
    supabase: Arc<SupabaseClient>,
    notifications: NotificationService,
    mailer: MailerClient,
    doctors: DoctorService,
    site_url: String,
}

impl StatusTransitionEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            notifications: NotificationService::new(config),
            mailer: MailerClient::new(config),
            doctors: DoctorService::new(config),
            site_url: config.site_url.clone(),
        }
    }

    /// Validate a transition against the enforced graph.
    pub fn validate_transition(
        current: AppointmentStatus,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !current.valid_transitions().contains(&new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::InvalidTransition { from: current, to: new });
        }
        Ok(())
    }

    /// Apply one transition: validate, stamp status-specific timestamps,
    /// persist, append exactly one history record, then emit one
    /// notification and one best-effort email to the patient.
    pub async fn apply(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        changed_by: Option<Uuid>,
        reason: Option<&str>,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let old_status = appointment.status;
        Self::validate_transition(old_status, new_status)?;

        debug!(
            "Applying transition {} -> {} for appointment {}",
            old_status, new_status, appointment.id
        );

        let mut update_data = Map::new();
        update_data.insert("status".to_string(), json!(new_status));
        update_data.insert("updated_at".to_string(), json!(now.to_rfc3339()));

        match new_status {
            AppointmentStatus::Approved => {
                update_data.insert("confirmed_at".to_string(), json!(now.to_rfc3339()));
            }
            AppointmentStatus::Completed => {
                update_data.insert("completed_at".to_string(), json!(now.to_rfc3339()));
            }
            AppointmentStatus::Cancelled => {
                update_data.insert(
                    "cancellation_reason".to_string(),
                    json!(reason.unwrap_or_default()),
                );
            }
            _ => {}
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
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
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let updated: Appointment = result
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })?;

        self.record_history(appointment.id, Some(old_status), new_status, changed_by, reason, now, auth_token)
            .await?;

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment.id, old_status, new_status
        );

        self.emit_side_effects(&updated, old_status, auth_token).await;

        Ok(updated)
    }

    /// Bulk variant of `apply`, scoped to one doctor. Ids that do not
    /// belong to the doctor, do not exist, or fail the transition graph are
    /// skipped, not failed. Returns the count actually updated.
    pub async fn bulk_apply(
        &self,
        doctor_id: Uuid,
        appointment_ids: &[Uuid],
        new_status: AppointmentStatus,
        changed_by: Option<Uuid>,
        reason: Option<&str>,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<usize, AppointmentError> {
        debug!(
            "Bulk transition to {} for {} appointments of doctor {}",
            new_status,
            appointment_ids.len(),
            doctor_id
        );

        let mut updated_count = 0;

        for appointment_id in appointment_ids {
            let path = format!(
                "/rest/v1/appointments?id=eq.{}&doctor_id=eq.{}",
                appointment_id, doctor_id
            );
            let result: Vec<Value> = self
                .supabase
                .request(Method::GET, &path, Some(auth_token), None)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

            let Some(row) = result.into_iter().next() else {
                debug!("Skipping appointment {}: not found for doctor", appointment_id);
                continue;
            };

            let appointment: Appointment = match serde_json::from_value(row) {
                Ok(a) => a,
                Err(e) => {
                    warn!("Skipping appointment {}: parse failure: {}", appointment_id, e);
                    continue;
                }
            };

            match self
                .apply(&appointment, new_status, changed_by, reason, now, auth_token)
                .await
            {
                Ok(_) => updated_count += 1,
                Err(AppointmentError::InvalidTransition { from, to }) => {
                    debug!(
                        "Skipping appointment {}: invalid transition {} -> {}",
                        appointment_id, from, to
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(updated_count)
    }

    /// Append one immutable history record for a transition.
    pub async fn record_history(
        &self,
        appointment_id: Uuid,
        old_status: Option<AppointmentStatus>,
        new_status: AppointmentStatus,
        changed_by: Option<Uuid>,
        reason: Option<&str>,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let body = json!({
            "appointment_id": appointment_id,
            "old_status": old_status,
            "new_status": new_status,
            "changed_by": changed_by,
            "reason": reason.unwrap_or_default(),
            "changed_at": now.to_rfc3339(),
        });

        let _: Vec<Value> = self
            .supabase
            .request(
                Method::POST,
                "/rest/v1/status_history",
                Some(auth_token),
                Some(body),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// One notification plus one best-effort email to the patient. The
    /// creation path notifies the doctor instead; a given event flows
    /// through exactly one of the two paths.
    async fn emit_side_effects(
        &self,
        appointment: &Appointment,
        old_status: AppointmentStatus,
        auth_token: &str,
    ) {
        if let Some(user_id) = appointment.user_id {
            let kind = match appointment.status {
                AppointmentStatus::Cancelled => NotificationType::AppointmentCancelled,
                AppointmentStatus::Rescheduled => NotificationType::AppointmentRescheduled,
                _ => NotificationType::StatusChanged,
            };
            let message = format!(
                "Your appointment status has been changed from {} to {}.",
                old_status, appointment.status
            );
            if let Err(e) = self
                .notifications
                .notify(
                    user_id,
                    kind,
                    "Appointment Status Updated",
                    &message,
                    Some(appointment.id),
                    auth_token,
                )
                .await
            {
                warn!("Failed to create status notification: {}", e);
            }
        }

        match self.doctors.get_doctor(appointment.doctor_id, auth_token).await {
            Ok(doctor) => {
                let email = emails::status_changed_email(appointment, &doctor.name, &self.site_url);
                self.mailer.send_best_effort(&email).await;
            }
            Err(e) => warn!("Skipping status email, doctor lookup failed: {}", e),
        }
    }
}
