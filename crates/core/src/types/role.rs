//! User roles.

use serde::{Deserialize, Serialize};

/// Role attached to a user account and carried in session claims.
///
/// `Anonymous` is the pre-registration state: the account exists but the
/// email address has not been verified yet, so it cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Registered but not yet verified.
    Anonymous,
    /// Verified regular user.
    Authenticated,
    /// Can list, read, create and update other users.
    Manager,
    /// Full access including deletion, role changes and unlocks.
    Admin,
}

impl UserRole {
    /// Every role, in ascending order of privilege.
    pub const ALL: [Self; 4] = [
        Self::Anonymous,
        Self::Authenticated,
        Self::Manager,
        Self::Admin,
    ];

    /// Wire name of the role (`"AUTHENTICATED"`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "ANONYMOUS",
            Self::Authenticated => "AUTHENTICATED",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Whether the account has completed email verification.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid user role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&UserRole::Authenticated).unwrap();
        assert_eq!(json, "\"AUTHENTICATED\"");
        let role: UserRole = serde_json::from_str("\"ANONYMOUS\"").unwrap();
        assert_eq!(role, UserRole::Anonymous);
    }

    #[test]
    fn test_only_anonymous_is_unverified() {
        assert!(!UserRole::Anonymous.is_verified());
        assert!(UserRole::Authenticated.is_verified());
        assert!(UserRole::Admin.is_verified());
    }
}
