//! Transactional email notifications.
//!
//! A [`Notification`] names a kind and carries its template bindings. The
//! [`NotificationDispatcher`] turns it into an [`OutgoingEmail`] (subject by
//! kind, body by template) and hands it to a [`MailTransport`]. Request
//! handlers never call the dispatcher directly; they enqueue on the
//! [`NotificationQueue`] and a background worker does the sending.

pub mod queue;
pub mod templates;
pub mod transport;

use std::sync::Arc;

use thiserror::Error;

use accounts_core::{NotificationKind, UnknownNotificationKind};

pub use queue::{NotificationQueue, QueueOptions};
pub use templates::{Bindings, RenderedEmail, TemplateError};
pub use transport::{
    LogMailer, MailTransport, OutgoingEmail, RecordingMailer, SmtpMailer, TransportError,
};

/// Errors that can occur when dispatching a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    UnknownType(#[from] UnknownNotificationKind),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl NotificationError {
    /// Whether sending again could succeed.
    ///
    /// Only relay failures qualify, and permanent SMTP replies (5xx) do not.
    /// Bad addresses and unbuildable messages fail the same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::Smtp(err)) => !err.is_permanent(),
            Self::Transport(TransportError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

/// One email to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Template fields. `email` is the recipient.
    pub bindings: Bindings,
}

impl Notification {
    /// Start a notification addressed to `email`, greeting `name`.
    #[must_use]
    pub fn new(kind: NotificationKind, email: &str, name: &str) -> Self {
        let mut bindings = Bindings::new();
        bindings.insert("email".to_owned(), email.to_owned());
        bindings.insert("name".to_owned(), name.to_owned());
        Self { kind, bindings }
    }

    /// Add a template binding.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.bindings.insert(key.to_owned(), value.into());
        self
    }
}

/// Renders notifications and sends them through a transport.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Build the outgoing email for a notification without sending it.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Template` if rendering fails or the
    /// `email` binding is missing.
    pub fn compose(notification: &Notification) -> Result<OutgoingEmail, NotificationError> {
        let to = notification
            .bindings
            .get("email")
            .ok_or(TemplateError::MissingBinding("email"))?
            .clone();
        let RenderedEmail { html, text } =
            templates::render(notification.kind.as_str(), &notification.bindings)?;

        Ok(OutgoingEmail {
            to,
            subject: notification.kind.subject().to_owned(),
            html,
            text,
        })
    }

    /// Render and send a notification.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if rendering or delivery fails.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let email = Self::compose(notification)?;
        self.transport.send(&email).await?;
        Ok(())
    }

    /// Send a notification named by its wire type (`"email_verification"`,
    /// `"password_reset"`, `"account_locked"`).
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::UnknownType` for any other type name, and
    /// the errors of [`Self::send`] otherwise.
    pub async fn dispatch(&self, kind: &str, bindings: Bindings) -> Result<(), NotificationError> {
        let kind: NotificationKind = kind.parse()?;
        self.send(&Notification { kind, bindings }).await
    }
}
