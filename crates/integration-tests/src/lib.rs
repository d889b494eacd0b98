//! Integration tests for the account service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p accounts-integration-tests
//! ```
//!
//! The harness drives the real router in-process with `tower::ServiceExt`.
//! Records live in [`MemoryUserStore`] and outgoing email is captured by a
//! [`RecordingMailer`], so no database or SMTP server is needed.
//!
//! # Test Categories
//!
//! - `registration` - Sign-up, verification links, duplicate handling
//! - `login` - Credentials, lockout, unlock
//! - `password_reset` - Reset request and confirmation
//! - `users` - Role-gated user management
//! - `notifications` - Email delivery through the background queue

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

use accounts_api::config::AppConfig;
use accounts_api::db::{MemoryUserStore, UserStore};
use accounts_api::models::{NewUser, User};
use accounts_api::routes;
use accounts_api::services::auth::CredentialHasher;
use accounts_api::services::email::{
    NotificationDispatcher, NotificationQueue, OutgoingEmail, QueueOptions, RecordingMailer,
};
use accounts_api::state::AppState;
use accounts_core::{Email, Nickname, UserId, UserRole};

/// Password that satisfies the strength rules.
pub const PASSWORD: &str = "Sup3r$ecret";

/// Public base URL used in emailed links.
pub const BASE_URL: &str = "http://localhost:8000/";

/// Failed logins that lock an account in tests.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `detail` field of an error body.
    #[must_use]
    pub fn detail(&self) -> &str {
        self.body["detail"].as_str().unwrap_or_default()
    }
}

/// In-process application with inspectable store and mailbox.
#[derive(Clone)]
pub struct TestApp {
    app: NormalizePath<Router>,
    pub state: AppState,
    pub store: Arc<MemoryUserStore>,
    pub mailer: RecordingMailer,
    hasher: CredentialHasher,
}

/// Configuration for tests. Never read from the environment.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://unused/accounts_test"),
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        base_url: BASE_URL.to_owned(),
        jwt_secret: SecretString::from("tq8Zr2Lw5Xb9Kd4Np7Hs1Vf6Gm3Jc0Ye8Ua5Ri2Ot9Wq4Ek7"),
        access_token_ttl_minutes: 30,
        max_login_attempts: MAX_LOGIN_ATTEMPTS,
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestApp {
    /// Start an application with the default mailer.
    pub fn spawn() -> Self {
        Self::spawn_with_mailer(RecordingMailer::new())
    }

    /// Start an application that delivers mail through `mailer`.
    pub fn spawn_with_mailer(mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryUserStore::new());
        let hasher = CredentialHasher::with_cost(1024, 1).unwrap();

        let dispatcher = NotificationDispatcher::new(Arc::new(mailer.clone()));
        let (notifications, _worker) = NotificationQueue::spawn_with(
            dispatcher,
            QueueOptions {
                backoff: Duration::from_millis(1),
                ..QueueOptions::default()
            },
        );

        let state = AppState::new(test_config(), store.clone(), hasher.clone(), notifications);

        Self {
            app: routes::app(state.clone()),
            state,
            store,
            mailer,
            hasher,
        }
    }

    /// Send a request through the full middleware stack.
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn builder(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match token {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let request = Self::builder(Method::GET, path, token)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let request = Self::builder(Method::DELETE, path, token)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> TestResponse {
        let request = Self::builder(method, path, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.send_json(Method::POST, path, body, token).await
    }

    pub async fn put_json(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.send_json(Method::PUT, path, body, token).await
    }

    /// POST an urlencoded form. Values must not contain `&`, `=` or `+`.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let request = Self::builder(Method::POST, path, None)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.request(request).await
    }

    /// Register through the public endpoint.
    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/register/",
            &json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Form login.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login/", &[("username", email), ("password", password)])
            .await
    }

    /// Log in and return the bearer token.
    pub async fn token(&self, email: &str, password: &str) -> String {
        let response = self.login(email, password).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.body["access_token"].as_str().unwrap().to_owned()
    }

    /// Insert a user directly into the store with the given role.
    ///
    /// Verified roles are created with a verified email address and no
    /// outstanding verification token.
    pub async fn seed_user(&self, email: &str, role: UserRole) -> User {
        let local = email.split('@').next().unwrap_or_default();
        self.store
            .insert(NewUser {
                email: Email::parse(email).unwrap(),
                nickname: Nickname::parse(&format!("{local}_nick")).unwrap(),
                first_name: None,
                last_name: None,
                bio: None,
                profile_picture_url: None,
                linkedin_profile_url: None,
                github_profile_url: None,
                role,
                email_verified: role.is_verified(),
                verification_token: None,
                hashed_password: self.hasher.hash(PASSWORD).await.unwrap(),
            })
            .await
            .unwrap()
    }

    /// Seed a user and log in as them.
    pub async fn seed_and_login(&self, email: &str, role: UserRole) -> (User, String) {
        let user = self.seed_user(email, role).await;
        let token = self.token(email, PASSWORD).await;
        (user, token)
    }

    /// Current record for `id`.
    pub async fn user(&self, id: UserId) -> Option<User> {
        self.store.get_by_id(id).await.unwrap()
    }

    /// Wait until `count` messages have been delivered to `address`.
    pub async fn wait_for_mail(&self, address: &str, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..400 {
            let sent = self.mailer.sent_to(address);
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {count} message(s) to {address}, got {}",
            self.mailer.sent_to(address).len()
        );
    }

    /// Wait for a message to `address` with the given subject.
    pub async fn wait_for_subject(&self, address: &str, subject: &str) -> OutgoingEmail {
        for _ in 0..400 {
            if let Some(email) = self
                .mailer
                .sent_to(address)
                .into_iter()
                .find(|email| email.subject == subject)
            {
                return email;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no {subject:?} message to {address}");
    }

    /// Register and follow the emailed verification link.
    pub async fn register_verified(&self, email: &str) -> Value {
        let response = self.register(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        if response.body["email_verified"] == Value::Bool(false) {
            let mail = self.wait_for_mail(email, 1).await;
            let path = link_path(&mail[0], "verify-email/");
            let verified = self.get(&path, None).await;
            assert_eq!(verified.status, StatusCode::OK, "{:?}", verified.body);
        }
        response.body
    }
}

/// Extract the request path of the emailed link containing `marker`.
///
/// Returns e.g. `/verify-email/{id}/{token}`.
#[must_use]
pub fn link_path(email: &OutgoingEmail, marker: &str) -> String {
    let start = email
        .text
        .find(&format!("{BASE_URL}{marker}"))
        .unwrap_or_else(|| panic!("no {marker} link in: {}", email.text));
    let link: String = email.text[start..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    format!("/{}", &link[BASE_URL.len()..])
}
