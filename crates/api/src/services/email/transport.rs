//! Outbound mail transports.
//!
//! [`SmtpMailer`] delivers through an SMTP relay with `lettre`.
//! [`LogMailer`] only logs, for deployments without SMTP settings.
//! [`RecordingMailer`] keeps sent messages in memory for tests.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// A fully rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum TransportError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The relay could not be reached. Sending again may succeed.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}

// =============================================================================
// SMTP
// =============================================================================

/// SMTP relay transport (STARTTLS, multipart text + HTML).
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| TransportError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| TransportError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

// =============================================================================
// Log-only
// =============================================================================

/// Transport that logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, email logged instead of sent"
        );
        // Bodies carry single-use tokens
        tracing::debug!(to = %email.to, body = %email.text, "Unsent email body");
        Ok(())
    }
}

// =============================================================================
// Recording
// =============================================================================

#[derive(Debug, Default)]
struct Mailbox {
    sent: Vec<OutgoingEmail>,
    failures_left: usize,
}

/// Transport that stores every message it is asked to send.
///
/// Clones share the same mailbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    mailbox: Arc<Mutex<Mailbox>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose first `failures` sends fail as if the relay were down.
    #[must_use]
    pub fn failing(failures: usize) -> Self {
        let mailer = Self::default();
        mailer.lock().failures_left = failures;
        mailer
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.lock().sent.clone()
    }

    /// Messages delivered to `address`.
    #[must_use]
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.lock()
            .sent
            .iter()
            .filter(|email| email.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let mut mailbox = self.lock();
        if mailbox.failures_left > 0 {
            mailbox.failures_left -= 1;
            return Err(TransportError::Unavailable("simulated outage".to_owned()));
        }
        mailbox.sent.push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_owned(),
            subject: "Verify Your Account".to_owned(),
            html: "<p>hi</p>".to_owned(),
            text: "hi".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_recording_mailer_records() {
        let mailer = RecordingMailer::new();
        let shared = mailer.clone();

        mailer.send(&email("a@example.com")).await.unwrap();
        mailer.send(&email("b@example.com")).await.unwrap();

        assert_eq!(shared.sent().len(), 2);
        assert_eq!(shared.sent_to("b@example.com").len(), 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_log_mailer_keeps_tokens_out_of_info_logs() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut message = email("a@example.com");
        message.text = "http://localhost:8000/reset-password/42/q8ZkT3vLmN0pWx7R".to_owned();
        LogMailer.send(&message).await.unwrap();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("a@example.com"));
        assert!(logs.contains("Verify Your Account"));
        assert!(!logs.contains("q8ZkT3vLmN0pWx7R"));
    }

    #[tokio::test]
    async fn test_failing_mailer_recovers() {
        let mailer = RecordingMailer::failing(1);

        assert!(mailer.send(&email("a@example.com")).await.is_err());
        assert!(mailer.send(&email("a@example.com")).await.is_ok());
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        assert!(LogMailer.send(&email("a@example.com")).await.is_ok());
    }
}
