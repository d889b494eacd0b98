//! Public authentication routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use accounts_core::{Email, UserId};

use crate::error::Result;
use crate::extract::{ApiForm, ApiJson, ApiPath};
use crate::models::{UserCreate, UserResponse};
use crate::services::auth::AccessToken;
use crate::state::AppState;

/// Login form (`application/x-www-form-urlencoded`). `username` is the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: Email,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub user_id: UserId,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Register a new account.
///
/// POST /register/
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state.auth().register(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange email and password for an access token.
///
/// POST /login/
pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<AccessToken>> {
    let token = state.auth().login(&form.username, &form.password).await?;
    Ok(Json(token))
}

/// Consume the link from the verification email.
///
/// GET /verify-email/{user_id}/{token}
pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath((user_id, token)): ApiPath<(UserId, String)>,
) -> Result<Json<MessageResponse>> {
    state.auth().verify_email(user_id, &token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified successfully",
    }))
}

/// Request a password reset email. Always accepted.
///
/// POST /password-reset/request
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PasswordResetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.auth().request_password_reset(&body.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the account exists, a password reset email has been sent",
        }),
    ))
}

/// Set a new password with the emailed token.
///
/// POST /password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>> {
    state
        .auth()
        .confirm_password_reset(body.user_id, &body.token, &body.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
