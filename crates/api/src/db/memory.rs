//! In-process user store.
//!
//! Holds every user behind a single `tokio` read/write lock. Each trait
//! method takes the lock once, so every operation is atomic with respect to
//! the others.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use accounts_core::{Email, Nickname, UserId, UserRole};

use super::{RepositoryError, UniqueField, UserStore};
use crate::models::{NewUser, User, UserChanges};
use crate::services::auth::{LockoutPolicy, LoginOutcome, LoginTransition};

/// User store kept in memory. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    users: &[User],
    skip: Option<UserId>,
    email: Option<&Email>,
    nickname: Option<&Nickname>,
) -> Result<(), RepositoryError> {
    for other in users.iter().filter(|u| Some(u.id) != skip) {
        if email.is_some_and(|email| &other.email == email) {
            return Err(RepositoryError::Conflict(UniqueField::Email));
        }
        if nickname.is_some_and(|nickname| &other.nickname == nickname) {
            return Err(RepositoryError::Conflict(UniqueField::Nickname));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn count(&self) -> Result<i64, RepositoryError> {
        let users = self.users.read().await;
        i64::try_from(users.len())
            .map_err(|_| RepositoryError::DataCorruption("user count overflow".to_owned()))
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, Some(&user.email), Some(&user.nickname))?;

        let now = Utc::now();
        let created = User {
            id: UserId::new_v4(),
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
            verification_token: user.verification_token,
            password_reset_token: None,
            hashed_password: user.hashed_password,
            failed_login_attempts: 0,
            is_locked: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.email == email).cloned())
    }

    async fn nickname_exists(&self, nickname: &Nickname) -> Result<bool, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| &u.nickname == nickname))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<(Vec<User>, i64), RepositoryError> {
        let users = self.users.read().await;
        let total = i64::try_from(users.len())
            .map_err(|_| RepositoryError::DataCorruption("user count overflow".to_owned()))?;

        // Insertion order is creation order.
        let page = users
            .iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        check_unique(
            &users,
            Some(id),
            changes.email.as_ref(),
            changes.nickname.as_ref(),
        )?;

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(nickname) = &changes.nickname {
            user.nickname = nickname.clone();
        }
        if let Some(first_name) = &changes.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(bio) = &changes.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(url) = &changes.profile_picture_url {
            user.profile_picture_url = Some(url.clone());
        }
        if let Some(url) = &changes.linkedin_profile_url {
            user.linkedin_profile_url = Some(url.clone());
        }
        if let Some(url) = &changes.github_profile_url {
            user.github_profile_url = Some(url.clone());
        }
        if let Some(role) = changes.role {
            user.role = role;
            user.email_verified = role.is_verified();
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn record_login_attempt(
        &self,
        id: UserId,
        outcome: LoginOutcome,
        policy: LockoutPolicy,
    ) -> Result<Option<LoginTransition>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        let transition = policy.transition(user.login_state(), outcome);
        let now = Utc::now();

        user.failed_login_attempts = transition.after.failed_attempts;
        user.is_locked = transition.after.locked;
        if outcome == LoginOutcome::Success && !transition.after.locked {
            user.last_login_at = Some(now);
        }
        user.updated_at = now;

        Ok(Some(transition))
    }

    async fn unlock(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        user.failed_login_attempts = 0;
        user.is_locked = false;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn mark_verified(
        &self,
        id: UserId,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users
            .iter_mut()
            .find(|u| u.id == id && u.verification_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };

        user.email_verified = true;
        user.verification_token = None;
        if user.role == UserRole::Anonymous {
            user.role = UserRole::Authenticated;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
    ) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };

        user.password_reset_token = Some(token.to_owned());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn reset_password(
        &self,
        id: UserId,
        token: &str,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users
            .iter_mut()
            .find(|u| u.id == id && u.password_reset_token.as_deref() == Some(token))
        else {
            return Ok(false);
        };

        hashed_password.clone_into(&mut user.hashed_password);
        user.password_reset_token = None;
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
