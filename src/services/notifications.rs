//! Organizer notifications.
//!
//! Delivery is best-effort: callers log and drop any error.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{config::NotificationsConfig, models::Event};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Mail API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl Notification {
    /// Tell the organizer their event's grace period is over and photos can
    /// be downloaded until the retention period ends.
    pub fn grace_period_ended(event: &Event, to: &str) -> Self {
        let download_until = event
            .retention_end()
            .map(|end| end.format("%B %-d, %Y at %H:%M UTC").to_string())
            .unwrap_or_else(|| "further notice".to_string());
        let subject = format!("Your event \"{}\" is now in its download period", event.name);
        let text_body = format!(
            "The grace period for \"{name}\" has ended and attendee face-scan sessions \
             have been closed.\n\nYou can download your event photos until {until}. \
             After that date all photos and face data for this event are permanently deleted.\n",
            name = event.name,
            until = download_until,
        );
        let html_body = format!(
            "<p>The grace period for <strong>{name}</strong> has ended and attendee \
             face-scan sessions have been closed.</p>\
             <p>You can download your event photos until <strong>{until}</strong>. \
             After that date all photos and face data for this event are permanently \
             deleted.</p>",
            name = escape_html(&event.name),
            until = download_until,
        );

        Self {
            to: to.to_string(),
            subject,
            html_body,
            text_body,
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> NotificationResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            "Notification (log sender, not delivered)"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends notifications through a JSON mail API.
///
/// POSTs `{from, to, subject, html, text}` to the configured endpoint.
pub struct HttpNotificationSender {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
}

impl HttpNotificationSender {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        from_address: &str,
        timeout: Duration,
    ) -> NotificationResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            from_address: from_address.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    #[instrument(skip(self, notification), fields(backend = "http", to = %notification.to))]
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        let body = MailRequest {
            from: &self.from_address,
            to: &notification.to,
            subject: &notification.subject,
            html: &notification.html_body,
            text: &notification.text_body,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| NotificationError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotificationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Notification delivered");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Create the notification sender from configuration.
pub fn create_notification_sender(
    config: &NotificationsConfig,
) -> NotificationResult<Arc<dyn NotificationSender>> {
    match config {
        NotificationsConfig::Log => Ok(Arc::new(LogNotificationSender)),
        NotificationsConfig::Http(http) => Ok(Arc::new(HttpNotificationSender::new(
            &http.endpoint,
            http.api_key.clone(),
            &http.from_address,
            Duration::from_secs(http.timeout_secs),
        )?)),
    }
}
