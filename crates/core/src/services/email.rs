//! Email notification service.

use std::sync::Arc;

use async_trait::async_trait;
use hasker_common::{AppError, AppResult, config::EmailSettings};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
}

/// Hands rendered messages to a mail system.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message.
    async fn send(&self, from: &str, message: &EmailMessage) -> AppResult<()>;
}

/// SMTP transport (STARTTLS relay).
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build a transport for `host:port`, authenticating when a username is
    /// configured.
    pub fn new(settings: &EmailSettings, host: &str) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Email(format!("Invalid SMTP relay {host}: {e}")))?
            .port(settings.smtp_port);

        if let Some(username) = &settings.smtp_username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                settings.smtp_password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, from: &str, message: &EmailMessage) -> AppResult<()> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid sender address: {e}")))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| AppError::Email(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        Ok(())
    }
}

/// Transport that only logs, used when no SMTP host is configured.
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, from: &str, message: &EmailMessage) -> AppResult<()> {
        info!(
            from = %from,
            to = %message.to,
            subject = %message.subject,
            "No SMTP host configured, email not delivered"
        );
        Ok(())
    }
}

/// Email service.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<dyn MailTransport>>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create an email service from settings. Disabled settings yield a
    /// service that drops every message.
    pub fn from_settings(settings: &EmailSettings, base_url: &str) -> AppResult<Self> {
        let transport: Option<Arc<dyn MailTransport>> = match (settings.enabled, &settings.smtp_host) {
            (false, _) => None,
            (true, Some(host)) => Some(Arc::new(SmtpMailTransport::new(settings, host)?)),
            (true, None) => Some(Arc::new(LogMailTransport)),
        };

        Ok(Self {
            transport,
            from_address: settings.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create an email service with a custom transport.
    #[must_use]
    pub fn with_transport(
        transport: Arc<dyn MailTransport>,
        from_address: &str,
        base_url: &str,
    ) -> Self {
        Self {
            transport: Some(transport),
            from_address: from_address.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check if email service is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send an email.
    pub async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| AppError::Email("Email service not configured".to_string()))?;

        transport.send(&self.from_address, message).await?;

        info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }

    /// Render the "new answer on your question" message.
    #[must_use]
    pub fn question_answered_message(
        &self,
        to: &str,
        username: &str,
        question_id: &str,
        question_title: &str,
    ) -> EmailMessage {
        let question_link = format!("{}/questions/{question_id}", self.base_url);
        let profile_link = format!("{}/profile", self.base_url);

        let text_body = format!(
            "Hello, {username}!\n\
             You have a new answer on your question \"{question_title}\" on Hasker. \
             Would you like to check it out? \n\
             {question_link}\n\n\
             If you do not want email alerts anymore, turn them off in your profile: {profile_link}"
        );
        let html_body = format!(
            "<p>Hello, {username}!</p>\
             <p>You have a new answer on your question \"{question_title}\" on Hasker. \
             Would you like to check it out?</p>\
             <p><a href=\"{question_link}\">Here is your link!</a></p>\
             <p>If you do not want email alerts anymore, turn them off in your \
             <a href=\"{profile_link}\">profile</a>.</p>"
        );

        EmailMessage {
            to: to.to_string(),
            subject: "Hasker - New answer for your question".to_string(),
            text_body,
            html_body,
        }
    }
}
