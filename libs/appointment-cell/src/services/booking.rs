// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use std::sync::Arc;

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use notification_cell::models::NotificationType;
use notification_cell::services::mailer::MailerClient;
use notification_cell::services::notify::NotificationService;
use shared_config::AppConfig;
use shared_database::supabase::{is_conflict_error, SupabaseClient};
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentSearchQuery,
    AppointmentStatus, BookAppointmentRequest, RescheduleAppointmentRequest, StatusHistory,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::emails;
use crate::services::transition::StatusTransitionEngine;

/// Whose appointments a listing or search is scoped to.
pub enum AppointmentScope {
    Patient(String),
    Doctor(Uuid),
    All,
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    conflict_service: ConflictDetectionService,
    transition_engine: StatusTransitionEngine,
    notifications: NotificationService,
    mailer: MailerClient,
    doctors: DoctorService,
    site_url: String,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let conflict_service = ConflictDetectionService::new(Arc::clone(&supabase));
        let transition_engine = StatusTransitionEngine::new(config);
        let notifications = NotificationService::new(config);
        let mailer = MailerClient::new(config);
        let doctors = DoctorService::new(config);

        Self {
            supabase,
            conflict_service,
            transition_engine,
            notifications,
            mailer,
            doctors,
            site_url: config.site_url.clone(),
        }
    }

    pub fn transition_engine(&self) -> &StatusTransitionEngine {
        &self.transition_engine
    }

    /// Book an appointment: conflict check, insert as `pending`, notify the
    /// doctor and send the patient a confirmation email. The conflict check
    /// and the insert are back-stopped by the datastore's live-slot unique
    /// index, which surfaces a concurrent double booking as `SlotTaken`.
    pub async fn book_appointment(
        &self,
        user: &User,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment with doctor {} on {} at {}",
            request.doctor_id, request.appointment_date, request.appointment_time
        );

        let patient_email = user.email.clone().ok_or_else(|| {
            AppointmentError::ValidationError(
                "An email address is required to book appointments".to_string(),
            )
        })?;
        if request.patient_name.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Patient name is required".to_string(),
            ));
        }

        let doctor = match self.doctors.get_doctor(request.doctor_id, auth_token).await {
            Ok(doctor) => doctor,
            Err(DoctorError::NotFound) => return Err(AppointmentError::DoctorNotFound),
            Err(e) => return Err(AppointmentError::DatabaseError(e.to_string())),
        };
        if !doctor.is_active {
            return Err(AppointmentError::ValidationError(
                "This doctor is not currently accepting appointments".to_string(),
            ));
        }

        self.conflict_service
            .ensure_slot_free(
                doctor.id,
                request.appointment_date,
                request.appointment_time,
                None,
                auth_token,
            )
            .await?;

        let user_id = Uuid::parse_str(&user.id).ok();
        let body = json!({
            "patient_name": request.patient_name,
            "patient_email": patient_email,
            "patient_phone": request.patient_phone,
            "doctor_id": doctor.id,
            "user_id": user_id,
            "appointment_date": request.appointment_date,
            "appointment_time": request.appointment_time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Pending,
            "priority": request.priority,
            "reason": request.reason,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
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
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| {
                if is_conflict_error(&e) {
                    AppointmentError::SlotTaken
                } else {
                    AppointmentError::DatabaseError(e.to_string())
                }
            })?;

        let appointment: Appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppointmentError::DatabaseError("Failed to create appointment".to_string())
            })
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })?;

        info!("Appointment {} booked, awaiting approval", appointment.id);

        // Creation path notifies the doctor; the transition path later
        // notifies the patient. Never both for one event.
        if let Some(doctor_user) = doctor.user_id {
            let message = format!(
                "New appointment request from {} for {} at {}.",
                appointment.patient_name,
                appointment.appointment_date,
                appointment.appointment_time.format("%H:%M"),
            );
            if let Err(e) = self
                .notifications
                .notify(
                    doctor_user,
                    NotificationType::AppointmentCreated,
                    "New Appointment Request",
                    &message,
                    Some(appointment.id),
                    auth_token,
                )
                .await
            {
                warn!("Failed to create booking notification: {}", e);
            }
        }

        let email = emails::booking_received_email(
            &appointment,
            &doctor.name,
            &doctor.specialization,
            &self.site_url,
        );
        self.mailer.send_best_effort(&email).await;

        Ok(appointment)
    }

    /// Move a live appointment to a new slot. The appointment passes
    /// through `rescheduled` and re-enters `scheduled` at the new time, so
    /// it keeps occupying exactly one live slot.
    pub async fn reschedule_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        let user_id = Uuid::parse_str(&user.id).ok();
        let owns = appointment.user_id.is_some() && appointment.user_id == user_id;
        if !owns && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        if !appointment.can_be_rescheduled() {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                to: AppointmentStatus::Rescheduled,
            });
        }

        // The appointment being moved never collides with itself.
        self.conflict_service
            .ensure_slot_free(
                appointment.doctor_id,
                request.new_date,
                request.new_time,
                Some(appointment.id),
                auth_token,
            )
            .await?;

        let old_date = appointment.appointment_date;
        let old_time = appointment.appointment_time;

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
                Some(json!({
                    "appointment_date": request.new_date,
                    "appointment_time": request.new_time.format("%H:%M:%S").to_string(),
                    "status": AppointmentStatus::Scheduled,
                    "updated_at": now.to_rfc3339(),
                })),
                Some(headers),
            )
            .await
            .map_err(|e| {
                if is_conflict_error(&e) {
                    AppointmentError::SlotTaken
                } else {
                    AppointmentError::DatabaseError(e.to_string())
                }
            })?;

        let updated: Appointment = result
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })?;

        // Two history rows capture the transitional pass-through.
        let move_reason = format!(
            "Rescheduled from {} {} to {} {}",
            old_date,
            old_time.format("%H:%M"),
            request.new_date,
            request.new_time.format("%H:%M"),
        );
        self.transition_engine
            .record_history(
                appointment.id,
                Some(appointment.status),
                AppointmentStatus::Rescheduled,
                user_id,
                Some(&move_reason),
                now,
                auth_token,
            )
            .await?;
        self.transition_engine
            .record_history(
                appointment.id,
                Some(AppointmentStatus::Rescheduled),
                AppointmentStatus::Scheduled,
                user_id,
                request.reason.as_deref(),
                now,
                auth_token,
            )
            .await?;

        info!("Appointment {} rescheduled: {}", appointment.id, move_reason);

        if let Some(patient_user) = updated.user_id {
            let message = format!(
                "Your appointment has been rescheduled to {} at {}.",
                updated.appointment_date,
                updated.appointment_time.format("%H:%M"),
            );
            if let Err(e) = self
                .notifications
                .notify(
                    patient_user,
                    NotificationType::AppointmentRescheduled,
                    "Appointment Rescheduled",
                    &message,
                    Some(updated.id),
                    auth_token,
                )
                .await
            {
                warn!("Failed to create reschedule notification: {}", e);
            }
        }

        match self.doctors.get_doctor(updated.doctor_id, auth_token).await {
            Ok(doctor) => {
                let email = emails::rescheduled_email(
                    &updated,
                    &doctor.name,
                    old_date,
                    old_time,
                    &self.site_url,
                );
                self.mailer.send_best_effort(&email).await;
            }
            Err(e) => warn!("Skipping reschedule email, doctor lookup failed: {}", e),
        }

        Ok(updated)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })
    }

    pub async fn get_status_history(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<StatusHistory>, AppointmentError> {
        let path = format!(
            "/rest/v1/status_history?appointment_id=eq.{}&order=changed_at.desc",
            appointment_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<StatusHistory>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse history: {}", e)))
    }

    /// Dashboard listing, scoped to a patient account or a doctor.
    pub async fn list_appointments(
        &self,
        scope: AppointmentScope,
        query: &AppointmentListQuery,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![];
        match scope {
            AppointmentScope::Patient(ref user_id) => {
                query_parts.push(format!("user_id=eq.{}", user_id));
            }
            AppointmentScope::Doctor(doctor_id) => {
                query_parts.push(format!("doctor_id=eq.{}", doctor_id));
            }
            AppointmentScope::All => {}
        }

        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if query.upcoming.unwrap_or(false) {
            query_parts.push(format!("appointment_date=gte.{}", now.date_naive()));
            query_parts.push("status=in.(approved,scheduled)".to_string());
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=created_at.desc",
            query_parts.join("&")
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// Substring/status/date-range search, role-scoped. The interactive
    /// search caps at 20 rows; export passes no limit.
    pub async fn search_appointments(
        &self,
        scope: AppointmentScope,
        query: &AppointmentSearchQuery,
        limit: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![];
        match scope {
            AppointmentScope::Patient(ref user_id) => {
                query_parts.push(format!("user_id=eq.{}", user_id));
            }
            AppointmentScope::Doctor(doctor_id) => {
                query_parts.push(format!("doctor_id=eq.{}", doctor_id));
            }
            AppointmentScope::All => {}
        }

        if let Some(ref q) = query.q {
            if !q.is_empty() {
                let pattern = urlencoding::encode(q).into_owned();
                query_parts.push(format!(
                    "or=(patient_name.ilike.*{pattern}*,reason.ilike.*{pattern}*)"
                ));
            }
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date_from) = query.date_from {
            query_parts.push(format!("appointment_date=gte.{}", date_from));
        }
        if let Some(date_to) = query.date_to {
            query_parts.push(format!("appointment_date=lte.{}", date_to));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=created_at.desc",
            query_parts.join("&")
        );
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={}", limit));
        }
        self.fetch_appointments(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments: {}", path);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }
}
