use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError};

/// Client for the transactional mail HTTP API. All sends are best-effort:
/// the transition and booking paths call `send_best_effort`, which logs a
/// failure and returns, so mail problems never fail the caller.
pub struct MailerClient {
    client: Client,
    api_url: String,
    api_token: String,
    from_address: String,
    configured: bool,
}

impl MailerClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_token: config.mail_api_token.clone(),
            from_address: config.mail_from_address.clone(),
            configured: config.is_mail_configured(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if !self.configured {
            return Err(NotificationError::MailNotConfigured);
        }

        debug!("Sending email to {}: {}", message.to, message.subject);

        let body = json!({
            "from": self.from_address,
            "to": message.to,
            "subject": message.subject,
            "html": message.html_body,
            "text": message.text_body,
        });

        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::MailDeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotificationError::MailDeliveryFailed(format!(
                "mail API returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    /// Fire-and-forget variant used from booking/transition side effects.
    pub async fn send_best_effort(&self, message: &EmailMessage) {
        if let Err(e) = self.send(message).await {
            warn!("Failed to send email to {}: {}", message.to, e);
        }
    }
}
