//! Registration notices
//!
//! Delivery is best effort: [`NotificationSink::dispatch`] hands the notice
//! to a background task and only logs the outcome. Nothing the notifier does
//! can reach the caller of `register`.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use serde::Serialize;
use std::{str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{
    config::{EmailConfig, NotificationConfig, NotificationKind},
    error::{AppError, AppResult},
};

pub const REGISTRATION_SUBJECT: &str = "Library Registration Notification";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Notice sent once a member has been registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationNotice {
    pub member_id: String,
    pub subject: String,
    pub message: String,
}

impl RegistrationNotice {
    pub fn for_member(member_id: &str) -> Self {
        Self {
            member_id: member_id.to_string(),
            subject: REGISTRATION_SUBJECT.to_string(),
            message: format!(
                "SMS sent to mobile number {}\nMember registered successfully in the lending registry.",
                member_id
            ),
        }
    }
}

/// Outbound channel for registration notices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError>;
}

/// Writes notices to the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        tracing::info!(member_id = %notice.member_id, subject = %notice.subject, "Registration notice");
        Ok(())
    }
}

/// POSTs notices as JSON to a messaging gateway
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!(
                "gateway answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Mails notices to the subscribed operator mailbox
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, notice: &RegistrationNotice) -> Result<Message, NotifyError> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Lending Registry");
        let from = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| NotifyError::Rejected(format!("Invalid from address: {}", e)))?;
        let to = Mailbox::from_str(&self.config.notify_to)
            .map_err(|e| NotifyError::Rejected(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&notice.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notice.message.clone())
            .map_err(|e| NotifyError::Rejected(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| NotifyError::Transport(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        let email = self.build_message(notice)?;
        let mailer = self.transport()?;

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .map_err(|e| NotifyError::Transport(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// Build the notifier selected in configuration
pub fn build_notifier(config: &NotificationConfig) -> AppResult<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.kind {
        NotificationKind::Log => Arc::new(LogNotifier),
        NotificationKind::Webhook => {
            let url = config.webhook_url.clone().ok_or_else(|| {
                AppError::Internal("notification.webhook_url is required for webhook notifications".to_string())
            })?;
            Arc::new(WebhookNotifier::new(url, Duration::from_secs(config.timeout_secs))?)
        }
        NotificationKind::Email => Arc::new(EmailNotifier::new(config.email.clone())),
    };

    tracing::info!("Registration notices via {}", notifier.channel());
    Ok(notifier)
}

/// Fire-and-forget dispatcher for registration notices
#[derive(Clone)]
pub struct NotificationSink {
    notifier: Arc<dyn Notifier>,
}

impl NotificationSink {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send the notice on a background task.
    ///
    /// The handle is only useful to tests; callers drop it.
    pub fn dispatch(&self, member_id: &str) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        let notice = RegistrationNotice::for_member(member_id);

        tokio::spawn(async move {
            match notifier.notify(&notice).await {
                Ok(()) => tracing::debug!(
                    member_id = %notice.member_id,
                    channel = notifier.channel(),
                    "Registration notice delivered"
                ),
                Err(e) => tracing::warn!(
                    member_id = %notice.member_id,
                    channel = notifier.channel(),
                    "Registration notice failed: {}",
                    e
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::function;

    #[tokio::test]
    async fn test_dispatch_sends_notice_for_member() {
        let mut notifier = MockNotifier::new();
        notifier.expect_channel().return_const("mock");
        notifier
            .expect_notify()
            .with(function(|n: &RegistrationNotice| {
                n.member_id == "9876543210" && n.subject == REGISTRATION_SUBJECT
            }))
            .times(1)
            .returning(|_| Ok(()));

        let sink = NotificationSink::new(Arc::new(notifier));
        sink.dispatch("9876543210").await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mut notifier = MockNotifier::new();
        notifier.expect_channel().return_const("mock");
        notifier
            .expect_notify()
            .times(1)
            .returning(|_| Err(NotifyError::Transport("gateway down".to_string())));

        let sink = NotificationSink::new(Arc::new(notifier));
        assert!(sink.dispatch("9876543210").await.is_ok());
    }

    #[test]
    fn test_webhook_requires_url() {
        let config = NotificationConfig {
            kind: NotificationKind::Webhook,
            webhook_url: None,
            ..NotificationConfig::default()
        };
        assert!(build_notifier(&config).is_err());
    }

    #[test]
    fn test_notice_text() {
        let notice = RegistrationNotice::for_member("9876543210");
        assert!(notice.message.contains("9876543210"));
        assert_eq!(notice.subject, "Library Registration Notification");
    }
}
