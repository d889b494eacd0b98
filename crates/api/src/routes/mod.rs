//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (record store)
//!
//! # Auth (public)
//! POST /register/                       - Register an account
//! POST /login/                          - Form login, returns a bearer token
//! GET  /verify-email/{user_id}/{token}  - Consume a verification link
//! POST /password-reset/request          - Email a reset link
//! POST /password-reset/confirm          - Set a new password with the token
//!
//! # Users (bearer token, role-gated)
//! GET    /users/                        - List users
//! POST   /users/                        - Create a user
//! GET    /users/{user_id}               - Fetch a user
//! PUT    /users/{user_id}               - Update a user
//! DELETE /users/{user_id}               - Delete a user
//! POST   /users/{user_id}/unlock        - Clear a lockout
//! ```
//!
//! Trailing slashes are trimmed before routing, so `/users` and `/users/`
//! reach the same handler.

pub mod auth;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-email/{user_id}/{token}", get(auth::verify_email))
        .route(
            "/password-reset/request",
            post(auth::request_password_reset),
        )
        .route(
            "/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
}

/// Create the user management routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{user_id}",
            get(users::show).put(users::update).delete(users::delete),
        )
        .route("/users/{user_id}/unlock", post(users::unlock))
}

/// Create all routes with state and request tracing applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth_routes())
        .merge(user_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap a router so that trailing slashes are trimmed before routing.
pub fn normalize(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// The complete application service.
pub fn app(state: AppState) -> NormalizePath<Router> {
    normalize(router(state))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the record store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
