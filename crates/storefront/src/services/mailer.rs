//! Transactional mail API client.
//!
//! The API takes `POST {from, to[], subject, html}` with a bearer key and
//! answers with a JSON body carrying an `id` on success.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::MailConfig;

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API key cannot be used as a header value.
    #[error("invalid API key format: {0}")]
    InvalidKey(String),

    /// Nobody to send to.
    #[error("message has no recipients")]
    NoRecipients,
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Anything that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Mail API client.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpMailer {
    /// Create a new mail API client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth_header =
            HeaderValue::from_str(&auth_value).map_err(|e| MailError::InvalidKey(e.to_string()))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    #[tracing::instrument(skip(self, email), fields(subject = %email.subject, recipients = email.to.len()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(email)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendResponse = response.json().await?;
        tracing::info!(message_id = sent.id.as_deref().unwrap_or("-"), "Email sent");
        Ok(())
    }
}

/// Transport that keeps messages in memory instead of sending them.
///
/// Used by tests and by local runs without a mail key.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    /// Messages "sent" so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        if self.fail {
            return Err(MailError::Api {
                status: 503,
                message: "mail transport disabled".to_owned(),
            });
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(to: &[&str]) -> OutgoingEmail {
        OutgoingEmail {
            from: "Shop <orders@shop.test>".to_owned(),
            to: to.iter().map(|s| (*s).to_owned()).collect(),
            subject: "Hello".to_owned(),
            html: "<p>Hi</p>".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer.send(&email(&["ann@example.com"])).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, vec!["ann@example.com".to_owned()]);
    }

    #[tokio::test]
    async fn test_no_recipients_is_rejected() {
        let mailer = RecordingMailer::new();
        assert!(matches!(
            mailer.send(&email(&[])).await,
            Err(MailError::NoRecipients)
        ));
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(email(&["a@example.com"])).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["subject"], "Hello");
        assert!(json.get("html").is_some());
    }
}
