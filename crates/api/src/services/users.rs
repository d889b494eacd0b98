//! Role-gated user management.
//!
//! Every operation checks the access policy first and only then touches the
//! record store.

use thiserror::Error;
use tracing::info;

use accounts_core::{UserId, UserRole};

use super::auth::{AuthError, AuthService};
use super::policy::{Caller, Operation, Scope, may_modify};
use crate::db::{RepositoryError, UniqueField, UserStore};
use crate::models::{AdminUserCreate, ListParams, User, UserChanges};

/// Errors from user management operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("operation not permitted")]
    Forbidden,

    #[error("user not found")]
    NotFound,

    #[error("email already exists")]
    EmailTaken,

    #[error("nickname already exists")]
    NicknameTaken,

    #[error("no fields to update")]
    EmptyUpdate,

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for UserError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(UniqueField::Email) => Self::EmailTaken,
            RepositoryError::Conflict(UniqueField::Nickname) => Self::NicknameTaken,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// One page of users.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// User management service.
pub struct UserService<'a> {
    store: &'a dyn UserStore,
    auth: AuthService<'a>,
}

fn authorize(
    caller: &Caller,
    operation: Operation,
    target: Option<UserId>,
) -> Result<(), UserError> {
    if caller.may(operation, target) {
        Ok(())
    } else {
        info!(
            caller = %caller.id,
            role = %caller.role,
            operation = ?operation,
            "Access denied"
        );
        Err(UserError::Forbidden)
    }
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn UserStore, auth: AuthService<'a>) -> Self {
        Self { store, auth }
    }

    /// List users in creation order.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden` without `ListUsers` permission and
    /// `UserError::InvalidPagination` for a negative `skip` or a `limit`
    /// outside `1..=100`.
    pub async fn list(&self, caller: &Caller, params: ListParams) -> Result<UserPage, UserError> {
        authorize(caller, Operation::ListUsers, None)?;

        if params.skip < 0 {
            return Err(UserError::InvalidPagination(
                "skip must not be negative".to_owned(),
            ));
        }
        if !(1..=ListParams::MAX_LIMIT).contains(&params.limit) {
            return Err(UserError::InvalidPagination(format!(
                "limit must be between 1 and {}",
                ListParams::MAX_LIMIT
            )));
        }

        let (users, total) = self.store.list(params.skip, params.limit).await?;
        Ok(UserPage {
            users,
            total,
            skip: params.skip,
            limit: params.limit,
        })
    }

    /// Fetch one user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden` or `UserError::NotFound`.
    pub async fn get(&self, caller: &Caller, id: UserId) -> Result<User, UserError> {
        authorize(caller, Operation::ReadUser, Some(id))?;
        self.store.get_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// Create a user on behalf of a privileged caller.
    ///
    /// Assigning a role above `AUTHENTICATED` additionally needs
    /// `ChangeRole` permission.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden`, conflicts, or the validation errors of
    /// registration.
    pub async fn create(&self, caller: &Caller, input: AdminUserCreate) -> Result<User, UserError> {
        authorize(caller, Operation::CreateUser, None)?;
        if matches!(input.role, Some(UserRole::Manager | UserRole::Admin)) {
            authorize(caller, Operation::ChangeRole, None)?;
        }

        let user = self
            .auth
            .provision(input.user, input.role)
            .await
            .map_err(|e| match e {
                AuthError::EmailTaken => UserError::EmailTaken,
                AuthError::NicknameTaken => UserError::NicknameTaken,
                other => UserError::Auth(other),
            })?;

        info!(caller = %caller.id, user_id = %user.id, "User created by administrator");
        Ok(user)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden`, `UserError::NotFound`,
    /// `UserError::EmptyUpdate` or a conflict.
    pub async fn update(
        &self,
        caller: &Caller,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, UserError> {
        authorize(caller, Operation::UpdateUser, Some(id))?;
        if changes.role.is_some() {
            authorize(caller, Operation::ChangeRole, Some(id))?;
        }
        if changes.is_empty() {
            return Err(UserError::EmptyUpdate);
        }

        if Scope::of(caller.id, id) == Scope::Other && caller.role != UserRole::Admin {
            let target = self.store.get_by_id(id).await?.ok_or(UserError::NotFound)?;
            if !may_modify(caller.role, target.role) {
                info!(
                    caller = %caller.id,
                    role = %caller.role,
                    target_role = %target.role,
                    "Access denied to privileged record"
                );
                return Err(UserError::Forbidden);
            }
        }

        let user = self
            .store
            .update(id, &changes)
            .await?
            .ok_or(UserError::NotFound)?;

        info!(caller = %caller.id, user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden` or `UserError::NotFound`.
    pub async fn delete(&self, caller: &Caller, id: UserId) -> Result<(), UserError> {
        authorize(caller, Operation::DeleteUser, Some(id))?;

        if !self.store.delete(id).await? {
            return Err(UserError::NotFound);
        }

        info!(caller = %caller.id, user_id = %id, "User deleted");
        Ok(())
    }

    /// Clear a lockout.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Forbidden` or `UserError::NotFound`.
    pub async fn unlock(&self, caller: &Caller, id: UserId) -> Result<User, UserError> {
        authorize(caller, Operation::UnlockUser, Some(id))?;

        let user = self.store.unlock(id).await?.ok_or(UserError::NotFound)?;

        info!(caller = %caller.id, user_id = %id, "User unlocked");
        Ok(user)
    }
}
