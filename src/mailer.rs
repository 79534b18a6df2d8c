//! Outbound verification mail.
//!
//! Registration hands the link to a [`Notifier`] on a detached task and never
//! waits for it; failures only reach the log.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
const MAIL_SUBJECT: &str = "Confirm your taskwarden registration";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail provider rejected the message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_verification_mail(
        &self,
        name: &str,
        email: &str,
        link: &str,
    ) -> Result<(), MailError>;
}

/// Used when no mail provider is configured: the link goes to the log instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_mail(
        &self,
        name: &str,
        email: &str,
        link: &str,
    ) -> Result<(), MailError> {
        log::warn!(
            "mail provider not configured; verification link for {} <{}>: {}",
            name,
            email,
            link
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Sends mail through a Resend-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

fn render_verification_mail(name: &str, link: &str) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>Confirm your email address to finish creating your account:</p>\
         <p><a href=\"{link}\">{link}</a></p>\
         <p>The link is only valid for a few minutes. If you did not sign up, ignore this message.</p>"
    )
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_verification_mail(
        &self,
        name: &str,
        email: &str,
        link: &str,
    ) -> Result<(), MailError> {
        let body = SendEmailBody {
            from: &self.from,
            to: [email],
            subject: MAIL_SUBJECT,
            html: render_verification_mail(name, link),
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            log::info!("verification mail sent to {}", email);
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
