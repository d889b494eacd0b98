//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::UserStore;
use crate::services::auth::{AuthService, CredentialHasher, TokenIssuer};
use crate::services::email::NotificationQueue;
use crate::services::users::UserService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the record store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    notifications: NotificationQueue,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `store` - User record store
    /// * `hasher` - Password hasher
    /// * `notifications` - Queue feeding the email worker
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        notifications: NotificationQueue,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.access_token_ttl());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                hasher,
                tokens,
                notifications,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the user record store.
    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the access token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Authentication service over this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        let inner = &*self.inner;
        AuthService::new(
            inner.store.as_ref(),
            &inner.hasher,
            &inner.tokens,
            inner.config.lockout_policy(),
            &inner.notifications,
            &inner.config.base_url,
        )
    }

    /// User management service over this state.
    #[must_use]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(self.inner.store.as_ref(), self.auth())
    }
}
