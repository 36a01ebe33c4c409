use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::models::{EmailMessage, NotificationError};
use notification_cell::services::mailer::MailerClient;
use shared_utils::test_utils::TestConfig;

fn message() -> EmailMessage {
    EmailMessage {
        to: "patient@example.com".to_string(),
        subject: "Appointment Update".to_string(),
        html_body: "<p>Hello</p>".to_string(),
        text_body: "Hello".to_string(),
    }
}

#[tokio::test]
async fn send_posts_to_the_mail_api() {
    let mail = MockServer::start().await;
    let config = TestConfig::default()
        .with_mail_api_url(&mail.uri())
        .to_app_config();

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({
            "to": "patient@example.com",
            "subject": "Appointment Update"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg-1" })))
        .expect(1)
        .mount(&mail)
        .await;

    let mailer = MailerClient::new(&config);
    assert!(mailer.is_configured());
    mailer.send(&message()).await.unwrap();
}

#[tokio::test]
async fn api_errors_surface_as_delivery_failures() {
    let mail = MockServer::start().await;
    let config = TestConfig::default()
        .with_mail_api_url(&mail.uri())
        .to_app_config();

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("relay unavailable"))
        .mount(&mail)
        .await;

    let mailer = MailerClient::new(&config);
    let err = mailer.send(&message()).await.unwrap_err();
    assert_matches!(err, NotificationError::MailDeliveryFailed(_));
}

#[tokio::test]
async fn unconfigured_mailer_refuses_but_best_effort_swallows() {
    let config = TestConfig::default().to_app_config();
    let mailer = MailerClient::new(&config);

    assert!(!mailer.is_configured());
    assert_matches!(
        mailer.send(&message()).await.unwrap_err(),
        NotificationError::MailNotConfigured
    );

    // Best-effort path logs and returns
    mailer.send_best_effort(&message()).await;
}
