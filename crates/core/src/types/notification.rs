//! Transactional email kinds.

use serde::{Deserialize, Serialize};

/// The closed set of transactional emails the service sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent after registration with the verification link.
    EmailVerification,
    /// Sent when a password reset is requested.
    PasswordReset,
    /// Sent when repeated failed logins lock the account.
    AccountLocked,
}

impl NotificationKind {
    /// Template / wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::AccountLocked => "account_locked",
        }
    }

    /// Fixed subject line for the kind.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::EmailVerification => "Verify Your Account",
            Self::PasswordReset => "Password Reset Instructions",
            Self::AccountLocked => "Account Locked Notification",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a notification type name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationKind(pub String);

impl std::str::FromStr for NotificationKind {
    type Err = UnknownNotificationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            "account_locked" => Ok(Self::AccountLocked),
            _ => Err(UnknownNotificationKind(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        for kind in [
            NotificationKind::EmailVerification,
            NotificationKind::PasswordReset,
            NotificationKind::AccountLocked,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert_eq!(
            "unknown_type".parse::<NotificationKind>(),
            Err(UnknownNotificationKind("unknown_type".to_owned()))
        );
    }

    #[test]
    fn test_subjects() {
        assert_eq!(
            NotificationKind::EmailVerification.subject(),
            "Verify Your Account"
        );
        assert_eq!(
            NotificationKind::AccountLocked.subject(),
            "Account Locked Notification"
        );
    }
}
