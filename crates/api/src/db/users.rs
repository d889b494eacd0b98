//! `PostgreSQL` user store.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use accounts_core::{Email, Nickname, ProfileUrl, UserId, UserRole};

use super::{RepositoryError, UniqueField, UserStore};
use crate::models::{NewUser, User, UserChanges};
use crate::services::auth::{LockoutPolicy, LoginOutcome, LoginState, LoginTransition};

/// Columns selected for every user query.
macro_rules! user_columns {
    () => {
        "id, email, nickname, first_name, last_name, bio, \
         profile_picture_url, linkedin_profile_url, github_profile_url, \
         role, email_verified, verification_token, password_reset_token, \
         hashed_password, failed_login_attempts, is_locked, last_login_at, \
         created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    nickname: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
    linkedin_profile_url: Option<String>,
    github_profile_url: Option<String>,
    role: UserRole,
    email_verified: bool,
    verification_token: Option<String>,
    password_reset_token: Option<String>,
    hashed_password: String,
    failed_login_attempts: i32,
    is_locked: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_url(column: &str, value: Option<String>) -> Result<Option<ProfileUrl>, RepositoryError> {
    value
        .map(|raw| {
            ProfileUrl::parse(&raw).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid {column} in database: {e}"))
            })
        })
        .transpose()
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let nickname = Nickname::parse(&row.nickname).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid nickname in database: {e}"))
        })?;
        let failed_login_attempts = u32::try_from(row.failed_login_attempts).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative failed_login_attempts in database: {}",
                row.failed_login_attempts
            ))
        })?;

        Ok(Self {
            id: UserId::from_uuid(row.id),
            email,
            nickname,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            profile_picture_url: parse_url("profile_picture_url", row.profile_picture_url)?,
            linkedin_profile_url: parse_url("linkedin_profile_url", row.linkedin_profile_url)?,
            github_profile_url: parse_url("github_profile_url", row.github_profile_url)?,
            role: row.role,
            email_verified: row.email_verified,
            verification_token: row.verification_token,
            password_reset_token: row.password_reset_token,
            hashed_password: row.hashed_password,
            failed_login_attempts,
            is_locked: row.is_locked,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map unique violations on the named constraints to `Conflict`.
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = match db_err.constraint() {
            Some("users_nickname_key") => UniqueField::Nickname,
            _ => UniqueField::Email,
        };
        return RepositoryError::Conflict(field);
    }
    RepositoryError::Database(e)
}

fn counter_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| {
        RepositoryError::DataCorruption(format!("failed_login_attempts out of range: {value}"))
    })
}

/// User store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (id, email, nickname, first_name, last_name, bio, \
             profile_picture_url, linkedin_profile_url, github_profile_url, \
             role, email_verified, verification_token, hashed_password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING ",
            user_columns!()
        ))
        .bind(UserId::new_v4())
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture_url)
        .bind(&user.linkedin_profile_url)
        .bind(&user.github_profile_url)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.try_into()
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn nickname_exists(&self, nickname: &Nickname) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE nickname = $1)")
                .bind(nickname)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<(Vec<User>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY created_at, id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<User>, _>>()?;

        Ok((users, self.count().await?))
    }

    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, RepositoryError> {
        // A role change also moves the verification flag: ANONYMOUS is the
        // unverified state.
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET \
             email = COALESCE($2, email), \
             nickname = COALESCE($3, nickname), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), \
             bio = COALESCE($6, bio), \
             profile_picture_url = COALESCE($7, profile_picture_url), \
             linkedin_profile_url = COALESCE($8, linkedin_profile_url), \
             github_profile_url = COALESCE($9, github_profile_url), \
             role = COALESCE($10, role), \
             email_verified = COALESCE($11, email_verified), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.nickname)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.bio)
        .bind(&changes.profile_picture_url)
        .bind(&changes.linkedin_profile_url)
        .bind(&changes.github_profile_url)
        .bind(changes.role)
        .bind(changes.role.map(|role| role.is_verified()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_login_attempt(
        &self,
        id: UserId,
        outcome: LoginOutcome,
        policy: LockoutPolicy,
    ) -> Result<Option<LoginTransition>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i32, bool)> = sqlx::query_as(
            "SELECT failed_login_attempts, is_locked FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((failed_attempts, locked)) = current else {
            return Ok(None);
        };

        let before = LoginState {
            failed_attempts: u32::try_from(failed_attempts).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "negative failed_login_attempts in database: {failed_attempts}"
                ))
            })?,
            locked,
        };
        let transition = policy.transition(before, outcome);
        let logged_in = outcome == LoginOutcome::Success && !transition.after.locked;

        sqlx::query(
            "UPDATE users SET failed_login_attempts = $2, is_locked = $3, \
             last_login_at = CASE WHEN $4 THEN NOW() ELSE last_login_at END, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(counter_to_db(transition.after.failed_attempts)?)
        .bind(transition.after.locked)
        .bind(logged_in)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(transition))
    }

    async fn unlock(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET failed_login_attempts = 0, is_locked = FALSE, updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn mark_verified(
        &self,
        id: UserId,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        // Accounts promoted beyond ANONYMOUS keep their role.
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET email_verified = TRUE, verification_token = NULL, \
             role = CASE WHEN role = 'ANONYMOUS' THEN 'AUTHENTICATED'::user_role ELSE role END, \
             updated_at = NOW() \
             WHERE id = $1 AND verification_token = $2 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_reset_token = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_password(
        &self,
        id: UserId,
        token: &str,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET hashed_password = $3, password_reset_token = NULL, \
             updated_at = NOW() WHERE id = $1 AND password_reset_token = $2",
        )
        .bind(id)
        .bind(token)
        .bind(hashed_password)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
