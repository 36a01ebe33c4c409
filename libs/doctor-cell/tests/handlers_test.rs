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

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestRows, TestConfig, TestUser};

async fn create_test_app(config: &TestConfig) -> Router {
    doctor_routes(config.to_arc())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn available_slots_walk_the_schedule_grid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());
    let doctor_id = Uuid::new_v4().to_string();

    // Monday schedule 09:00-17:00, hourly slots
    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("day_of_week", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::weekly_schedule(&doctor_id, 1, "09:00:00", "17:00:00", 60)
        ])))
        .mount(&mock_server)
        .await;

    // One live booking at 10:00
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "appointment_time": "10:00:00" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_intervals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    // 2024-06-10 is a Monday
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}/slots?date=2024-06-10", doctor_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let slots = body["availability"]["slots"].as_array().unwrap();

    // 8 grid slots minus the 10:00 booking
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[0], "09:00:00");
    assert!(!slots.iter().any(|s| s == "10:00:00"));
}

#[tokio::test]
async fn unscheduled_day_returns_empty_with_reason() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}/slots?date=2024-06-10", doctor_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["availability"]["slots"].as_array().unwrap().len(), 0);
    assert_eq!(body["availability"]["reason"], "unscheduled");
}

#[tokio::test]
async fn schedule_upsert_requires_doctor_role() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());

    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/me/schedule/1")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "start_time": "09:00:00",
                        "end_time": "17:00:00",
                        "slot_duration_minutes": 30,
                        "is_available": true
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
