//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("email already exists")]
    EmailTaken,

    #[error("nickname already exists")]
    NicknameTaken,

    /// Unknown email, wrong password or unverified account.
    ///
    /// Deliberately a single variant so callers cannot tell the cases apart.
    #[error("incorrect email or password")]
    AuthFailed,

    /// Too many failed logins.
    #[error("account locked")]
    AccountLocked,

    #[error("invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("invalid or expired password reset token")]
    InvalidResetToken,

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
