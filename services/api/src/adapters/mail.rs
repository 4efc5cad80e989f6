//! services/api/src/adapters/mail.rs
//!
//! Adapters implementing the `MailService` port.

use academy_core::ports::{MailService, PortError, PortResult};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

//=========================================================================================
// HTTP mail API adapter
//=========================================================================================

/// Sends email through a transactional mail provider's JSON HTTP API.
#[derive(Clone)]
pub struct HttpMailAdapter {
    client: reqwest::Client,
    config: MailConfig,
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailAdapter {
    /// Creates a new `HttpMailAdapter`.
    pub fn new(client: reqwest::Client, config: MailConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MailService for HttpMailAdapter {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> PortResult<()> {
        let payload = OutgoingEmail {
            from: &self.config.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Mail API rejected message to {} ({}): {}",
                to, status, body
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Log-only adapter
//=========================================================================================

/// Used when no mail provider is configured; records what would have been sent.
#[derive(Clone, Default)]
pub struct LogOnlyMailer;

#[async_trait]
impl MailService for LogOnlyMailer {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> PortResult<()> {
        info!(%to, %subject, "Mail delivery disabled; message not sent");
        Ok(())
    }
}
