// Email transport: Resend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Result of a send attempt. Transport failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn sent(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    /// False when the transport is not configured; callers should skip work
    fn is_available(&self) -> bool;

    async fn send_email(&self, email: &OutboundEmail) -> SendOutcome;
}

/// Resend email client
pub struct ResendEmailClient {
    api_key: Option<String>,
    from_email: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

impl ResendEmailClient {
    pub fn new(api_key: Option<String>, from_email: String, base_url: String) -> Self {
        Self {
            api_key,
            from_email,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, api_key: &str, email: &OutboundEmail) -> Result<String, String> {
        let request = ResendEmailRequest {
            from: &self.from_email,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request error: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Resend API error ({}): {}", status, error_text));
        }

        let result: ResendEmailResponse = response
            .json()
            .await
            .map_err(|e| format!("Invalid Resend response: {}", e))?;
        Ok(result.id)
    }
}

#[async_trait]
impl EmailService for ResendEmailClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send_email(&self, email: &OutboundEmail) -> SendOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return SendOutcome::failed("Email service not configured");
        };

        match self.post(api_key, email).await {
            Ok(id) => {
                info!("📧 Email sent via Resend: {}", id);
                SendOutcome::sent(id)
            }
            Err(error) => {
                warn!("📧 Email to {} failed: {}", email.to, error);
                SendOutcome::failed(error)
            }
        }
    }
}
