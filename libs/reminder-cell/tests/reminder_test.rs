use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reminder_cell::services::reminder::{reminder_due_at, ReminderService};
use shared_utils::test_utils::{MockPostgrestRows, TestConfig};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn due_timestamp_is_start_minus_offset() {
    let due = reminder_due_at(d(2024, 6, 10), t(10, 0), 24.0);
    assert_eq!(due, Utc.with_ymd_and_hms(2024, 6, 9, 10, 0, 0).unwrap());
}

#[test]
fn fractional_hour_offsets_are_supported() {
    let due = reminder_due_at(d(2024, 6, 10), t(10, 0), 0.5);
    assert_eq!(due, Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap());
}

#[tokio::test]
async fn sweep_sends_due_reminder_and_marks_it_sent() {
    let supabase = MockServer::start().await;
    let mail = MockServer::start().await;
    let config = TestConfig::default()
        .with_supabase_url(&supabase.uri())
        .with_mail_api_url(&mail.uri())
        .to_app_config();

    let reminder_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    // One due, unsent reminder; the sweep only ever queries is_sent=false
    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("is_sent", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::reminder(
                &reminder_id,
                &appointment_id,
                24.0,
                "2024-06-09T10:00:00Z",
                false,
            )
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &Uuid::new_v4().to_string(),
                "2024-06-10",
                "10:00:00",
                "scheduled",
            )
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &Uuid::new_v4().to_string(), "Dr. Test", "General Practice")
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg-1" })))
        .expect(1)
        .mount(&mail)
        .await;

    // Exactly one is_sent=true flip
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({ "is_sent": true, "sent_via": "email" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&supabase)
        .await;

    let service = ReminderService::new(&config);
    let now = Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap();
    let outcome = service.run_due_reminders(now, "test-token").await.unwrap();

    assert_eq!(outcome.due, 1);
    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn sweep_with_nothing_due_is_a_no_op() {
    let supabase = MockServer::start().await;
    let mail = MockServer::start().await;
    let config = TestConfig::default()
        .with_supabase_url(&supabase.uri())
        .with_mail_api_url(&mail.uri())
        .to_app_config();

    // All reminders already sent: the is_sent filter returns nothing, so a
    // second sweep over the same rows never re-sends.
    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("is_sent", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mail)
        .await;

    let service = ReminderService::new(&config);
    let outcome = service
        .run_due_reminders(Utc::now(), "test-token")
        .await
        .unwrap();

    assert_eq!(outcome.due, 0);
    assert_eq!(outcome.sent, 0);
}

#[tokio::test]
async fn delivery_failure_records_error_and_leaves_unsent() {
    let supabase = MockServer::start().await;
    let mail = MockServer::start().await;
    let config = TestConfig::default()
        .with_supabase_url(&supabase.uri())
        .with_mail_api_url(&mail.uri())
        .to_app_config();

    let reminder_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("is_sent", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::reminder(
                &reminder_id,
                &appointment_id,
                24.0,
                "2024-06-09T10:00:00Z",
                false,
            )
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &Uuid::new_v4().to_string(),
                "2024-06-10",
                "10:00:00",
                "scheduled",
            )
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &Uuid::new_v4().to_string(), "Dr. Test", "General Practice")
        ])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("smtp relay down"))
        .mount(&mail)
        .await;

    // Never flips is_sent on failure
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({ "is_sent": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&supabase)
        .await;

    // Records the error message so a later sweep can retry
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&supabase)
        .await;

    let service = ReminderService::new(&config);
    let now = Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap();
    let outcome = service.run_due_reminders(now, "test-token").await.unwrap();

    assert_eq!(outcome.due, 1);
    assert_eq!(outcome.sent, 0);
    assert_eq!(outcome.failed, 1);
}
