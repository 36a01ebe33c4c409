use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use std::sync::Arc;

use appointment_cell::models::Appointment;
use doctor_cell::services::doctor::DoctorService;
use notification_cell::models::EmailMessage;
use notification_cell::services::mailer::MailerClient;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateReminderRequest, Reminder, ReminderError, SweepOutcome};

pub struct ReminderService {
    supabase: Arc<SupabaseClient>,
    mailer: MailerClient,
    doctors: DoctorService,
}

impl ReminderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            mailer: MailerClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    /// Create an unsent reminder due `hours_before` the appointment's
    /// combined date and time.
    pub async fn create_reminder(
        &self,
        request: CreateReminderRequest,
        auth_token: &str,
    ) -> Result<Reminder, ReminderError> {
        if request.hours_before <= 0.0 {
            return Err(ReminderError::ValidationError(
                "Reminder offset must be positive".to_string(),
            ));
        }

        let appointment = self
            .get_appointment(request.appointment_id, auth_token)
            .await?;

        let scheduled_for = reminder_due_at(
            appointment.appointment_date,
            appointment.appointment_time,
            request.hours_before,
        );

        debug!(
            "Creating {} reminder for appointment {} due {}",
            request.channel, appointment.id, scheduled_for
        );

        let body = json!({
            "appointment_id": appointment.id,
            "channel": request.channel,
            "hours_before": request.hours_before,
            "scheduled_for": scheduled_for.to_rfc3339(),
            "is_sent": false,
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
                "/rest/v1/reminders",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| ReminderError::DatabaseError("Failed to create reminder".to_string()))
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ReminderError::DatabaseError(format!("Failed to parse reminder: {}", e))
                })
            })
    }

    pub async fn delete_reminder(
        &self,
        reminder_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ReminderError> {
        let path = format!("/rest/v1/reminders?id=eq.{}", reminder_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn get_reminder(
        &self,
        reminder_id: Uuid,
        auth_token: &str,
    ) -> Result<Reminder, ReminderError> {
        let path = format!("/rest/v1/reminders?id=eq.{}", reminder_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(ReminderError::NotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ReminderError::DatabaseError(format!("Failed to parse reminder: {}", e))
                })
            })
    }

    pub async fn list_for_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Reminder>, ReminderError> {
        let path = format!(
            "/rest/v1/reminders?appointment_id=eq.{}&order=scheduled_for.asc",
            appointment_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Reminder>, _>>()
            .map_err(|e| ReminderError::DatabaseError(format!("Failed to parse reminders: {}", e)))
    }

    /// Sweep due, unsent reminders and attempt delivery. A success marks
    /// the reminder sent (at-most-once marking via `is_sent`); a failure
    /// records the error and leaves the row unsent so a later sweep
    /// retries. Not safe to run two sweeps in parallel.
    pub async fn run_due_reminders(
        &self,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<SweepOutcome, ReminderError> {
        let path = format!(
            "/rest/v1/reminders?is_sent=eq.false&scheduled_for=lte.{}&order=scheduled_for.asc",
            now.to_rfc3339()
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        let reminders: Vec<Reminder> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Reminder>, _>>()
            .map_err(|e| ReminderError::DatabaseError(format!("Failed to parse reminders: {}", e)))?;

        let mut outcome = SweepOutcome {
            due: reminders.len(),
            sent: 0,
            failed: 0,
        };

        for reminder in reminders {
            if !reminder.channel.includes_email() {
                debug!(
                    "Skipping reminder {}: channel {} has no configured transport",
                    reminder.id, reminder.channel
                );
                continue;
            }

            match self.deliver_email(&reminder, auth_token).await {
                Ok(()) => {
                    self.mark_sent(reminder.id, now, "email", auth_token).await?;
                    outcome.sent += 1;
                    info!("Sent reminder {} for appointment {}", reminder.id, reminder.appointment_id);
                }
                Err(e) => {
                    warn!("Failed to send reminder {}: {}", reminder.id, e);
                    self.record_failure(reminder.id, &e.to_string(), auth_token)
                        .await?;
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Reminder sweep finished: {} due, {} sent, {} failed",
            outcome.due, outcome.sent, outcome.failed
        );
        Ok(outcome)
    }

    // Private helper methods

    async fn deliver_email(
        &self,
        reminder: &Reminder,
        auth_token: &str,
    ) -> Result<(), ReminderError> {
        let appointment = self
            .get_appointment(reminder.appointment_id, auth_token)
            .await?;

        let doctor_name = match self
            .doctors
            .get_doctor(appointment.doctor_id, auth_token)
            .await
        {
            Ok(doctor) => doctor.name,
            Err(_) => "your doctor".to_string(),
        };

        let email = reminder_email(&appointment, &doctor_name);
        self.mailer
            .send(&email)
            .await
            .map_err(|e| ReminderError::DeliveryFailed(e.to_string()))
    }

    async fn mark_sent(
        &self,
        reminder_id: Uuid,
        now: DateTime<Utc>,
        via: &str,
        auth_token: &str,
    ) -> Result<(), ReminderError> {
        let path = format!("/rest/v1/reminders?id=eq.{}", reminder_id);
        let _: Vec<Value> = self
            .supabase
            .request(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({
                    "is_sent": true,
                    "sent_at": now.to_rfc3339(),
                    "sent_via": via,
                    "error_message": null,
                })),
            )
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn record_failure(
        &self,
        reminder_id: Uuid,
        error: &str,
        auth_token: &str,
    ) -> Result<(), ReminderError> {
        let path = format!("/rest/v1/reminders?id=eq.{}", reminder_id);
        let _: Vec<Value> = self
            .supabase
            .request(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "error_message": error })),
            )
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, ReminderError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(ReminderError::AppointmentNotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ReminderError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })
    }
}

/// Due timestamp: the appointment's combined date and time minus the
/// offset, in whole minutes (offsets like 0.5 hours are supported).
pub fn reminder_due_at(date: NaiveDate, time: NaiveTime, hours_before: f64) -> DateTime<Utc> {
    let starts_at = date.and_time(time).and_utc();
    starts_at - Duration::minutes((hours_before * 60.0).round() as i64)
}

fn reminder_email(appointment: &Appointment, doctor_name: &str) -> EmailMessage {
    let subject = format!("Appointment Reminder - {}", doctor_name);

    let text_body = format!(
        "Dear {},\n\nThis is a reminder for your upcoming appointment:\n\n\
         Doctor: {}\nDate: {}\nTime: {}\n\n\
         Please arrive 15 minutes early and bring any relevant medical documents.\n\n\
         If you need to reschedule, please do so at least 24 hours in advance.\n\n\
         Best regards,\nCarePort Team",
        appointment.patient_name,
        doctor_name,
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M"),
    );

    let html_body = format!(
        "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h2>Appointment Reminder</h2>\
         <p>Dear {},</p>\
         <p>This is a reminder for your upcoming appointment:</p>\
         <p><strong>Doctor:</strong> {}<br>\
         <strong>Date:</strong> {}<br>\
         <strong>Time:</strong> {}</p>\
         <p>Please arrive 15 minutes early and bring any relevant medical documents.</p>\
         <p>Best regards,<br>CarePort Team</p>\
         </body></html>",
        appointment.patient_name,
        doctor_name,
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M"),
    );

    EmailMessage {
        to: appointment.patient_email.clone(),
        subject,
        html_body,
        text_body,
    }
}
