//! User record store.
//!
//! # Tables
//!
//! - `users` - Accounts, credentials, verification/reset tokens and lockout state
//!
//! # Implementations
//!
//! - [`PgUserStore`] - `PostgreSQL` via `sqlx` (production)
//! - [`MemoryUserStore`] - in-process store for tests and local development
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p accounts-cli -- migrate
//! ```

pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use accounts_core::{Email, Nickname, UserId};

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

use crate::models::{NewUser, User, UserChanges};
use crate::services::auth::{LockoutPolicy, LoginOutcome, LoginTransition};

/// Column that a uniqueness conflict was raised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nickname,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => f.write_str("email"),
            Self::Nickname => f.write_str("nickname"),
        }
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("{0} already exists")]
    Conflict(UniqueField),
}

/// Persistence for user accounts.
///
/// Every method is a single atomic operation against the store. Methods that
/// take a one-time token only succeed when the stored token matches, and
/// consume it in the same step.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Number of stored users.
    async fn count(&self) -> Result<i64, RepositoryError>;

    /// Insert a new user.
    ///
    /// Returns `RepositoryError::Conflict` when the email or nickname is taken.
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn nickname_exists(&self, nickname: &Nickname) -> Result<bool, RepositoryError>;

    /// One page of users ordered by creation time, plus the total count.
    async fn list(&self, skip: i64, limit: i64) -> Result<(Vec<User>, i64), RepositoryError>;

    /// Apply a partial update. Returns `None` if the user does not exist.
    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, RepositoryError>;

    /// Delete a user. Returns whether a row was removed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Record a login attempt against the lockout state machine.
    ///
    /// The read and write of the counter are serialized per user. A
    /// successful attempt that leaves the account unlocked also stamps
    /// `last_login_at`. Returns `None` if the user does not exist.
    async fn record_login_attempt(
        &self,
        id: UserId,
        outcome: LoginOutcome,
        policy: LockoutPolicy,
    ) -> Result<Option<LoginTransition>, RepositoryError>;

    /// Clear the lock flag and reset the failed-login counter.
    async fn unlock(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Consume a verification token and promote the user to `AUTHENTICATED`.
    ///
    /// Returns `None` when the user does not exist or the token does not match.
    async fn mark_verified(&self, id: UserId, token: &str)
    -> Result<Option<User>, RepositoryError>;

    /// Store a fresh password reset token. Returns whether the user exists.
    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
    ) -> Result<bool, RepositoryError>;

    /// Consume a reset token and replace the password hash.
    ///
    /// Returns whether the token matched.
    async fn reset_password(
        &self,
        id: UserId,
        token: &str,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
