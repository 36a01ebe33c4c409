use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub mail_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            mail_api_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(mut self, url: &str) -> Self {
        self.supabase_url = url.to_string();
        self
    }

    pub fn with_mail_api_url(mut self, url: &str) -> Self {
        self.mail_api_url = url.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            mail_api_url: self.mail_api_url.clone(),
            mail_api_token: if self.mail_api_url.is_empty() {
                String::new()
            } else {
                "test-mail-token".to_string()
            },
            mail_from_address: "noreply@careport.test".to_string(),
            site_url: "http://localhost:3000".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockPostgrestRows;

impl MockPostgrestRows {
    pub fn doctor(doctor_id: &str, user_id: &str, name: &str, specialization: &str) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "name": name,
            "specialization": specialization,
            "email": "doctor@example.com",
            "phone": "",
            "is_active": true,
            "consultation_fee": 50.0,
            "experience_years": 5,
            "description": "",
            "affiliation": "",
            "license_number": "",
            "average_rating": 0.0,
            "total_reviews": 0,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn weekly_schedule(
        doctor_id: &str,
        day_of_week: i32,
        start_time: &str,
        end_time: &str,
        slot_duration_minutes: i32,
    ) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "slot_duration_minutes": slot_duration_minutes,
            "max_appointments": 8,
            "is_available": true
        })
    }

    pub fn appointment(
        appointment_id: &str,
        doctor_id: &str,
        user_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_name": "Test Patient",
            "patient_email": "patient@example.com",
            "patient_phone": "",
            "doctor_id": doctor_id,
            "user_id": user_id,
            "appointment_date": date,
            "appointment_time": time,
            "status": status,
            "priority": "normal",
            "reason": "",
            "notes": "",
            "cancellation_reason": "",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
            "confirmed_at": null,
            "completed_at": null
        })
    }

    pub fn reminder(
        reminder_id: &str,
        appointment_id: &str,
        hours_before: f64,
        scheduled_for: &str,
        is_sent: bool,
    ) -> Value {
        json!({
            "id": reminder_id,
            "appointment_id": appointment_id,
            "channel": "email",
            "hours_before": hours_before,
            "scheduled_for": scheduled_for,
            "is_sent": is_sent,
            "sent_at": null,
            "sent_via": null,
            "error_message": null,
            "created_at": Utc::now().to_rfc3339()
        })
    }
}
