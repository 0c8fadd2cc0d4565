// src/services/mailer.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail provider answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outgoing e-mail. Callers log failures; nothing upstream depends on delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Transactional mail provider reached over HTTPS with a bearer API key.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_url, api_key, from }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = OutgoingMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }

        tracing::debug!("mail '{}' accepted for {}", email.subject, email.to);
        Ok(())
    }
}

/// Used when no provider is configured: the message only goes to the log.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!("mail (not sent, no provider) to={} subject={}", email.to, email.subject);
        Ok(())
    }
}
