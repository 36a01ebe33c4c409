use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestRows, TestConfig, TestUser};

async fn create_test_app(config: &TestConfig) -> Router {
    appointment_routes(config.to_arc())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_body(doctor_id: &str) -> String {
    json!({
        "doctor_id": doctor_id,
        "appointment_date": "2024-06-10",
        "appointment_time": "10:00:00",
        "patient_name": "Test Patient",
        "reason": "Checkup"
    })
    .to_string()
}

#[tokio::test]
async fn booking_a_free_slot_succeeds() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let patient = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &doctor_user_id, "Dr. Test", "General Practice")
        ])))
        .mount(&mock_server)
        .await;

    // Conflict check finds the slot free
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2024-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestRows::appointment(
                &Uuid::new_v4().to_string(),
                &doctor_id,
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "pending",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Creation path notifies the doctor
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(booking_body(&doctor_id)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["status"], "pending");
}

#[tokio::test]
async fn booking_an_occupied_slot_collides() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let patient = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &Uuid::new_v4().to_string(), "Dr. Test", "General Practice")
        ])))
        .mount(&mock_server)
        .await;

    // A live appointment already holds the slot
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2024-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4().to_string() }
        ])))
        .mount(&mock_server)
        .await;

    // The insert must never run
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(booking_body(&doctor_id)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn reschedule_excludes_itself_from_the_collision_check() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let patient = TestUser::patient("patient@example.com");
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Conflict check must carry the self-exclusion filter; the slot being
    // "re-booked" is the appointment's own current one.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "scheduled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Pass-through history: old -> rescheduled, rescheduled -> scheduled
    Mock::given(method("POST"))
        .and(path("/rest/v1/status_history"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &Uuid::new_v4().to_string(), "Dr. Test", "General Practice")
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/reschedule", appointment_id))
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "new_date": "2024-06-10",
                        "new_time": "10:00:00"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn patients_may_only_cancel() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let patient = TestUser::patient("patient@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &Uuid::new_v4().to_string(),
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/status", appointment_id))
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "status": "approved" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cancelling_own_appointment_records_history() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let patient = TestUser::patient("patient@example.com");
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::appointment(
                &appointment_id,
                &doctor_id,
                &patient.id,
                "2024-06-10",
                "10:00:00",
                "cancelled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/status_history"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::doctor(&doctor_id, &Uuid::new_v4().to_string(), "Dr. Test", "General Practice")
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/status", appointment_id))
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "status": "cancelled", "reason": "Conflict with work" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["new_status"], "cancelled");
}
