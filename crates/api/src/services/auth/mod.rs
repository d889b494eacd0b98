//! Authentication service.
//!
//! Registration, email verification, password login with failed-login
//! lockout, access token issuance and password reset.

mod error;
mod lockout;
mod password;
mod token;

pub use error::AuthError;
pub use lockout::{LockoutPolicy, LoginOutcome, LoginState, LoginTransition};
pub use password::{CredentialHasher, validate_password_strength};
pub use token::{AccessToken, Claims, TokenError, TokenIssuer};

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use accounts_core::{Email, Nickname, NotificationKind, UserId, UserRole};

use crate::db::{RepositoryError, UniqueField, UserStore};
use crate::models::{NewUser, User, UserCreate};
use crate::services::email::{Notification, NotificationQueue};

/// Length of verification and reset tokens.
const TOKEN_LENGTH: usize = 32;

/// Attempts at finding a free generated nickname.
const NICKNAME_ATTEMPTS: usize = 10;

const ADJECTIVES: &[&str] = &[
    "clever", "jolly", "brave", "sly", "gentle", "swift", "quiet", "bright", "lucky", "witty",
    "calm", "bold", "eager", "fuzzy", "proud",
];

const NOUNS: &[&str] = &[
    "panda", "fox", "raccoon", "koala", "lion", "otter", "falcon", "badger", "heron", "lynx",
    "moose", "owl", "tiger", "whale", "yak",
];

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn UserStore,
    hasher: &'a CredentialHasher,
    tokens: &'a TokenIssuer,
    lockout: LockoutPolicy,
    notifications: &'a NotificationQueue,
    base_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    ///
    /// `base_url` must end with `/`; verification and reset links are
    /// appended to it.
    #[must_use]
    pub const fn new(
        store: &'a dyn UserStore,
        hasher: &'a CredentialHasher,
        tokens: &'a TokenIssuer,
        lockout: LockoutPolicy,
        notifications: &'a NotificationQueue,
        base_url: &'a str,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            lockout,
            notifications,
            base_url,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new account.
    ///
    /// The account starts as `ANONYMOUS` and a verification email is queued.
    /// The first account ever registered becomes a verified `ADMIN`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::EmailTaken` / `AuthError::NicknameTaken` on conflicts.
    pub async fn register(&self, input: UserCreate) -> Result<User, AuthError> {
        self.provision(input, None).await
    }

    /// Create an account, optionally with an explicit role.
    ///
    /// Without a role (or with `ANONYMOUS`) this follows the registration
    /// lifecycle. Any other role creates the account pre-verified and sends
    /// no verification email.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn provision(
        &self,
        input: UserCreate,
        role: Option<UserRole>,
    ) -> Result<User, AuthError> {
        validate_password_strength(&input.password)?;

        let nickname = match input.nickname {
            Some(nickname) => nickname,
            None => self.generate_free_nickname().await?,
        };

        let (role, verification_token) = if self.store.count().await? == 0 {
            (UserRole::Admin, None)
        } else {
            match role {
                None | Some(UserRole::Anonymous) => {
                    (UserRole::Anonymous, Some(generate_token()))
                }
                Some(role) => (role, None),
            }
        };

        let hashed_password = self.hasher.hash(&input.password).await?;

        let user = self
            .store
            .insert(NewUser {
                email: input.email,
                nickname,
                first_name: input.first_name,
                last_name: input.last_name,
                bio: input.bio,
                profile_picture_url: input.profile_picture_url,
                linkedin_profile_url: input.linkedin_profile_url,
                github_profile_url: input.github_profile_url,
                role,
                email_verified: role.is_verified(),
                verification_token,
                hashed_password,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(UniqueField::Email) => AuthError::EmailTaken,
                RepositoryError::Conflict(UniqueField::Nickname) => AuthError::NicknameTaken,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, role = %user.role, "User account created");

        if let Some(token) = &user.verification_token {
            self.notifications.enqueue(
                Notification::new(
                    NotificationKind::EmailVerification,
                    user.email.as_str(),
                    user.display_name(),
                )
                .with("verification_url", self.verification_url(user.id, token)),
            );
        }

        Ok(user)
    }

    async fn generate_free_nickname(&self) -> Result<Nickname, AuthError> {
        for _ in 0..NICKNAME_ATTEMPTS {
            let Some(candidate) = generate_nickname() else {
                continue;
            };
            if !self.store.nickname_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(AuthError::NicknameTaken)
    }

    // =========================================================================
    // Email Verification
    // =========================================================================

    /// Link embedded in the verification email.
    #[must_use]
    pub fn verification_url(&self, user_id: UserId, token: &str) -> String {
        format!("{}verify-email/{user_id}/{token}", self.base_url)
    }

    /// Consume a verification token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidVerificationToken` if the user does not
    /// exist or the token does not match the outstanding one.
    pub async fn verify_email(&self, user_id: UserId, token: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .mark_verified(user_id, token)
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Log in with email and password and issue an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthFailed` for an unknown email, a wrong password
    /// or an unverified account. Returns `AuthError::AccountLocked` once the
    /// failed-login threshold has been reached, whether or not the password
    /// is correct.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        let email = Email::parse(username).map_err(|_| AuthError::AuthFailed)?;

        let user = self
            .store
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::AuthFailed)?;

        if !user.email_verified || !user.role.is_verified() {
            return Err(AuthError::AuthFailed);
        }

        if user.is_locked {
            return Err(AuthError::AccountLocked);
        }

        let outcome = if self.hasher.verify(password, &user.hashed_password).await {
            LoginOutcome::Success
        } else {
            LoginOutcome::Failure
        };

        let transition = self
            .store
            .record_login_attempt(user.id, outcome, self.lockout)
            .await?
            .ok_or(AuthError::AuthFailed)?;

        // Another attempt may have locked the account while this password
        // was being checked.
        if transition.locked_out(outcome) {
            return Err(AuthError::AccountLocked);
        }

        match outcome {
            LoginOutcome::Failure => {
                if transition.just_locked() {
                    warn!(
                        user_id = %user.id,
                        attempts = transition.after.failed_attempts,
                        "Account locked after repeated failed logins"
                    );
                    self.notifications.enqueue(Notification::new(
                        NotificationKind::AccountLocked,
                        user.email.as_str(),
                        user.display_name(),
                    ));
                }
                Err(AuthError::AuthFailed)
            }
            LoginOutcome::Success => {
                let token = self.tokens.issue(user.id, user.role)?;
                info!(user_id = %user.id, role = %user.role, "User logged in");
                Ok(AccessToken::bearer(token))
            }
        }
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Link embedded in the password reset email.
    #[must_use]
    pub fn reset_url(&self, user_id: UserId, token: &str) -> String {
        format!("{}reset-password/{user_id}/{token}", self.base_url)
    }

    /// Start a password reset.
    ///
    /// Succeeds whether or not the address belongs to an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn request_password_reset(&self, email: &Email) -> Result<(), AuthError> {
        let Some(user) = self.store.get_by_email(email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        if !self.store.set_password_reset_token(user.id, &token).await? {
            return Ok(());
        }

        self.notifications.enqueue(
            Notification::new(
                NotificationKind::PasswordReset,
                user.email.as_str(),
                user.display_name(),
            )
            .with("reset_url", self.reset_url(user.id, &token)),
        );

        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Finish a password reset with the emailed token.
    ///
    /// Does not unlock a locked account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for a weak new password and
    /// `AuthError::InvalidResetToken` if the token does not match.
    pub async fn confirm_password_reset(
        &self,
        user_id: UserId,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password_strength(new_password)?;
        let hashed_password = self.hasher.hash(new_password).await?;

        if !self
            .store
            .reset_password(user_id, token, &hashed_password)
            .await?
        {
            return Err(AuthError::InvalidResetToken);
        }

        info!(user_id = %user_id, "Password reset completed");
        Ok(())
    }
}

/// Random single-use token for verification and reset links.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Random `<adjective>_<noun>_<number>` nickname.
fn generate_nickname() -> Option<Nickname> {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng)?;
    let noun = NOUNS.choose(&mut rng)?;
    let number: u16 = rng.random_range(0..1000);

    Nickname::parse(&format!("{adjective}_{noun}_{number}")).ok()
}
