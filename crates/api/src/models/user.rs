//! User domain types and their API representations.
//!
//! Domain types are separate from database row types and from the request
//! and response bodies the HTTP layer exchanges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use accounts_core::{Email, Nickname, ProfileUrl, UserId, UserRole};

use crate::services::auth::LoginState;

/// A user account (domain type).
///
/// Implements `Debug` manually so that the password hash and one-time
/// tokens never reach logs.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login and contact address, unique.
    pub email: Email,
    /// Public handle, unique.
    pub nickname: Nickname,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<ProfileUrl>,
    pub linkedin_profile_url: Option<ProfileUrl>,
    pub github_profile_url: Option<ProfileUrl>,
    /// Current role. `Anonymous` until the email address is verified.
    pub role: UserRole,
    /// Whether the verification link has been consumed.
    pub email_verified: bool,
    /// Outstanding single-use verification token.
    pub verification_token: Option<String>,
    /// Outstanding single-use password reset token.
    pub password_reset_token: Option<String>,
    /// Argon2 PHC string.
    pub hashed_password: String,
    /// Consecutive failed logins since the last success.
    pub failed_login_attempts: u32,
    /// Set when `failed_login_attempts` reaches the lockout threshold.
    pub is_locked: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Login bookkeeping for the lockout state machine.
    #[must_use]
    pub const fn login_state(&self) -> LoginState {
        LoginState {
            failed_attempts: self.failed_login_attempts,
            locked: self.is_locked,
        }
    }

    /// Name used to greet the user in emails.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.nickname.as_str())
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .field("email_verified", &self.email_verified)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("is_locked", &self.is_locked)
            .field("hashed_password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Everything needed to insert a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub nickname: Nickname,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<ProfileUrl>,
    pub linkedin_profile_url: Option<ProfileUrl>,
    pub github_profile_url: Option<ProfileUrl>,
    pub role: UserRole,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub hashed_password: String,
}

/// Longest first or last name the record store accepts.
pub const NAME_MAX_LENGTH: usize = 100;

/// Optional name field limited to [`NAME_MAX_LENGTH`] characters.
fn bounded_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let name = Option::<String>::deserialize(deserializer)?;
    match name {
        Some(name) if name.chars().count() > NAME_MAX_LENGTH => Err(D::Error::custom(format!(
            "name must be at most {NAME_MAX_LENGTH} characters"
        ))),
        name => Ok(name),
    }
}

/// Partial update of a user's profile.
///
/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub nickname: Option<Nickname>,
    #[serde(default, deserialize_with = "bounded_name")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "bounded_name")]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<ProfileUrl>,
    pub linkedin_profile_url: Option<ProfileUrl>,
    pub github_profile_url: Option<ProfileUrl>,
    pub role: Option<UserRole>,
}

impl UserChanges {
    /// Whether the payload changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nickname.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture_url.is_none()
            && self.linkedin_profile_url.is_none()
            && self.github_profile_url.is_none()
            && self.role.is_none()
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Self-registration body (`POST /register/`).
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: Email,
    pub password: String,
    /// Generated when omitted.
    pub nickname: Option<Nickname>,
    #[serde(default, deserialize_with = "bounded_name")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "bounded_name")]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<ProfileUrl>,
    pub linkedin_profile_url: Option<ProfileUrl>,
    pub github_profile_url: Option<ProfileUrl>,
}

/// Administrative create body (`POST /users/`).
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserCreate {
    #[serde(flatten)]
    pub user: UserCreate,
    /// Explicit role. Omit to follow the normal verification lifecycle.
    pub role: Option<UserRole>,
}

/// Pagination parameters for `GET /users/`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "ListParams::default_limit")]
    pub limit: i64,
}

impl ListParams {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    const fn default_limit() -> i64 {
        Self::DEFAULT_LIMIT
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

// =============================================================================
// Response Bodies
// =============================================================================

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: Email,
    pub nickname: Nickname,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<ProfileUrl>,
    pub linkedin_profile_url: Option<ProfileUrl>,
    pub github_profile_url: Option<ProfileUrl>,
    pub role: UserRole,
    pub email_verified: bool,
    pub is_locked: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            nickname: user.nickname,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture_url: user.profile_picture_url,
            linkedin_profile_url: user.linkedin_profile_url,
            github_profile_url: user.github_profile_url,
            role: user.role,
            email_verified: user.email_verified,
            is_locked: user.is_locked,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// One page of users.
#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}
