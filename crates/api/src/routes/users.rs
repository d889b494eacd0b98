//! Role-gated user management routes.

use axum::{Json, extract::State, http::StatusCode};

use accounts_core::UserId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAuth;
use crate::models::{AdminUserCreate, ListParams, UserChanges, UserListResponse, UserResponse};
use crate::state::AppState;

/// GET /users/
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<UserListResponse>> {
    let page = state.users().list(&caller, params).await?;
    Ok(Json(UserListResponse {
        items: page.users.into_iter().map(UserResponse::from).collect(),
        total: page.total,
        skip: page.skip,
        limit: page.limit,
    }))
}

/// POST /users/
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(input): ApiJson<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state.users().create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/{user_id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<UserResponse>> {
    let user = state.users().get(&caller, user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /users/{user_id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(changes): ApiJson<UserChanges>,
) -> Result<Json<UserResponse>> {
    let user = state.users().update(&caller, user_id, changes).await?;
    Ok(Json(user.into()))
}

/// DELETE /users/{user_id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<StatusCode> {
    state.users().delete(&caller, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/{user_id}/unlock
pub async fn unlock(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<UserResponse>> {
    let user = state.users().unlock(&caller, user_id).await?;
    Ok(Json(user.into()))
}
