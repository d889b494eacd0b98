//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"detail": "..."}`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::{RepositoryError, UniqueField};
use crate::services::auth::AuthError;
use crate::services::users::UserError;

const EMAIL_EXISTS: &str = "Email already exists";
const NICKNAME_EXISTS: &str = "Nickname already exists";
const AUTH_FAILED: &str = "Incorrect email or password.";
const ACCOUNT_LOCKED: &str = "Account locked due to too many failed login attempts.";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// User management operation failed.
    #[error("User error: {0}")]
    Users(#[from] UserError),

    /// Request body or parameters failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, malformed or expired bearer token.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            Self::Auth(err) => auth_status(err),
            Self::Users(err) => match err {
                UserError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "Operation not permitted".to_string(),
                ),
                UserError::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                UserError::EmailTaken => (StatusCode::BAD_REQUEST, EMAIL_EXISTS.to_string()),
                UserError::NicknameTaken => (StatusCode::BAD_REQUEST, NICKNAME_EXISTS.to_string()),
                UserError::EmptyUpdate => {
                    (StatusCode::BAD_REQUEST, "No fields to update".to_string())
                }
                UserError::InvalidPagination(msg) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
                }
                UserError::Auth(err) => auth_status(err),
                UserError::Repository(err) => repository_status(err),
            },
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "Could not validate credentials".to_string(),
            ),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::Conflict(UniqueField::Email) => {
            (StatusCode::BAD_REQUEST, EMAIL_EXISTS.to_string())
        }
        RepositoryError::Conflict(UniqueField::Nickname) => {
            (StatusCode::BAD_REQUEST, NICKNAME_EXISTS.to_string())
        }
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::WeakPassword(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
        AuthError::EmailTaken => (StatusCode::BAD_REQUEST, EMAIL_EXISTS.to_string()),
        AuthError::NicknameTaken => (StatusCode::BAD_REQUEST, NICKNAME_EXISTS.to_string()),
        AuthError::AuthFailed => (StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string()),
        AuthError::AccountLocked => (StatusCode::BAD_REQUEST, ACCOUNT_LOCKED.to_string()),
        AuthError::InvalidVerificationToken => (
            StatusCode::BAD_REQUEST,
            "Invalid or expired verification token".to_string(),
        ),
        AuthError::InvalidResetToken => (
            StatusCode::BAD_REQUEST,
            "Invalid or expired password reset token".to_string(),
        ),
        AuthError::Repository(err) => repository_status(err),
        AuthError::Token(_) | AuthError::PasswordHash => internal(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn detail(err: AppError) -> String {
        let body = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["detail"].as_str().unwrap().to_owned()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Validation("limit out of range".to_string());
        assert_eq!(err.to_string(), "Validation error: limit out of range");

        let err = AppError::Users(UserError::NotFound);
        assert_eq!(err.to_string(), "User error: user not found");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Users(UserError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthenticated("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::AccountLocked)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Users(UserError::Forbidden)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::PasswordHash)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let response = AppError::Auth(AuthError::AuthFailed).into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn test_detail_messages() {
        assert_eq!(
            detail(AppError::Auth(AuthError::AuthFailed)).await,
            "Incorrect email or password."
        );
        assert_eq!(
            detail(AppError::Users(UserError::Repository(RepositoryError::Conflict(
                UniqueField::Email
            ))))
            .await,
            "Email already exists"
        );
        assert_eq!(
            detail(AppError::Users(UserError::Repository(RepositoryError::Database(
                sqlx::Error::PoolTimedOut
            ))))
            .await,
            "Internal server error"
        );
    }
}
