use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use std::sync::Arc;

use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AnalyticsOverview, AnalyticsPeriod, AnalyticsResponse, Appointment, AppointmentError,
    AppointmentPriority, AppointmentStatus, DailyTrendPoint, TopDoctor,
};

pub struct AnalyticsService {
    supabase: Arc<SupabaseClient>,
    doctors: DoctorService,
}

impl AnalyticsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            doctors: DoctorService::new(config),
        }
    }

    /// Analytics over appointments created in the trailing window. Doctors
    /// see their own practice; admins see everything plus the top-doctor
    /// leaderboard.
    pub async fn analytics(
        &self,
        doctor_scope: Option<Uuid>,
        days: i64,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<AnalyticsResponse, AppointmentError> {
        let end_date = now.date_naive();
        let start_date = end_date - Duration::days(days);

        debug!("Computing analytics for {} days ending {}", days, end_date);

        let mut query_parts = vec![
            format!("created_at=gte.{}", start_date),
            format!("created_at=lte.{}T23:59:59Z", end_date),
        ];
        if let Some(doctor_id) = doctor_scope {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })?;

        let mut response = build_analytics(&appointments, start_date, end_date, days);

        if doctor_scope.is_none() {
            response.top_doctors = self.top_doctors(&appointments, auth_token).await?;
        }

        Ok(response)
    }

    /// Top 5 doctors by appointment count inside the window.
    async fn top_doctors(
        &self,
        appointments: &[Appointment],
        auth_token: &str,
    ) -> Result<Vec<TopDoctor>, AppointmentError> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for appointment in appointments {
            *counts.entry(appointment.doctor_id).or_insert(0) += 1;
        }

        let mut ranked: Vec<(Uuid, i64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(5);

        let mut top = Vec::with_capacity(ranked.len());
        for (doctor_id, appointment_count) in ranked {
            match self.doctors.get_doctor(doctor_id, auth_token).await {
                Ok(doctor) => top.push(TopDoctor {
                    doctor_id,
                    name: doctor.name,
                    specialization: doctor.specialization,
                    appointment_count,
                }),
                Err(_) => continue,
            }
        }

        Ok(top)
    }
}

/// Distribution, trend and success-rate aggregation. Pure over the fetched
/// rows; the top-doctor leaderboard is filled in separately.
pub fn build_analytics(
    appointments: &[Appointment],
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i64,
) -> AnalyticsResponse {
    let total = appointments.len() as i64;

    let status_distribution: Vec<(AppointmentStatus, i64)> = AppointmentStatus::all()
        .into_iter()
        .map(|status| {
            let count = appointments.iter().filter(|a| a.status == status).count() as i64;
            (status, count)
        })
        .collect();

    let priorities = [
        AppointmentPriority::Low,
        AppointmentPriority::Normal,
        AppointmentPriority::High,
        AppointmentPriority::Urgent,
    ];
    let priority_distribution: Vec<(AppointmentPriority, i64)> = priorities
        .into_iter()
        .map(|priority| {
            let count = appointments.iter().filter(|a| a.priority == priority).count() as i64;
            (priority, count)
        })
        .collect();

    let trend_days = days.min(30);
    let mut daily_trends = Vec::with_capacity(trend_days as usize);
    for offset in (0..trend_days).rev() {
        let date = end_date - Duration::days(offset);
        let count = appointments
            .iter()
            .filter(|a| a.created_at.date_naive() == date)
            .count() as i64;
        daily_trends.push(DailyTrendPoint { date, appointments: count });
    }

    let completed = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .count() as i64;
    let cancelled = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Cancelled)
        .count() as i64;
    let success_rate = if total > 0 {
        ((completed as f64 / total as f64) * 10000.0).round() / 100.0
    } else {
        0.0
    };

    AnalyticsResponse {
        period: AnalyticsPeriod { start_date, end_date, days },
        overview: AnalyticsOverview {
            total_appointments: total,
            completed_appointments: completed,
            cancelled_appointments: cancelled,
            success_rate,
        },
        status_distribution,
        priority_distribution,
        daily_trends,
        top_doctors: vec![],
    }
}

/// CSV export of an appointment listing.
pub fn export_to_csv(appointments: &[Appointment]) -> String {
    let mut out = String::from(
        "id,patient_name,patient_email,doctor_id,appointment_date,appointment_time,status,priority,reason,created_at\n",
    );
    for appointment in appointments {
        let row = [
            appointment.id.to_string(),
            appointment.patient_name.clone(),
            appointment.patient_email.clone(),
            appointment.doctor_id.to_string(),
            appointment.appointment_date.to_string(),
            appointment.appointment_time.format("%H:%M").to_string(),
            appointment.status.to_string(),
            appointment.priority.to_string(),
            appointment.reason.clone().unwrap_or_default(),
            appointment.created_at.to_rfc3339(),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_escape(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
