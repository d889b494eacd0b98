//! Account administration commands.
//!
//! These bypass the HTTP role checks and act directly on the record store,
//! which makes them the recovery path when the only admin is locked out.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use accounts_api::db::{self, PgUserStore, RepositoryError, UserStore};
use accounts_api::models::{User, UserChanges};
use accounts_core::{Email, EmailError, UnknownRole, UserRole};
use thiserror::Error;

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error(transparent)]
    Config(#[from] MissingDatabaseUrl),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Record store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}. Valid roles: ANONYMOUS, AUTHENTICATED, MANAGER, ADMIN")]
    InvalidRole(#[from] UnknownRole),

    #[error("No user with email: {0}")]
    NotFound(Email),
}

async fn connect() -> Result<PgUserStore, UserCommandError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(PgUserStore::new(pool))
}

async fn find(store: &PgUserStore, email: &Email) -> Result<User, UserCommandError> {
    store
        .get_by_email(email)
        .await?
        .ok_or_else(|| UserCommandError::NotFound(email.clone()))
}

/// Reset the failed-login counter and clear the lock.
///
/// # Errors
///
/// Returns an error if the email is malformed, no such user exists, or the
/// database is unreachable.
pub async fn unlock(email: &str) -> Result<(), UserCommandError> {
    let email: Email = email.parse()?;
    let store = connect().await?;
    let user = find(&store, &email).await?;

    let user = store
        .unlock(user.id)
        .await?
        .ok_or(UserCommandError::NotFound(email))?;

    tracing::info!(user_id = %user.id, email = %user.email, "User unlocked");
    Ok(())
}

/// Assign a role. Verified roles also mark the email as verified.
///
/// # Errors
///
/// Returns an error if the email or role is malformed, no such user exists,
/// or the database is unreachable.
pub async fn set_role(email: &str, role: &str) -> Result<(), UserCommandError> {
    let email: Email = email.parse()?;
    let role: UserRole = role.parse()?;
    let store = connect().await?;
    let user = find(&store, &email).await?;

    let changes = UserChanges {
        role: Some(role),
        ..UserChanges::default()
    };
    let user = store
        .update(user.id, &changes)
        .await?
        .ok_or(UserCommandError::NotFound(email))?;

    tracing::info!(
        user_id = %user.id,
        email = %user.email,
        role = %user.role,
        "Role updated"
    );
    Ok(())
}
