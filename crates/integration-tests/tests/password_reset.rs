//! Integration tests for the password reset flow.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use accounts_core::UserRole;
use accounts_integration_tests::{MAX_LOGIN_ATTEMPTS, PASSWORD, TestApp, link_path};

const NEW_PASSWORD: &str = "N3w!Passw0rd";

/// Request a reset for `email` and return `(user_id, token)` from the link.
async fn reset_link(app: &TestApp, email: &str) -> (String, String) {
    let response = app
        .post_json("/password-reset/request", &json!({ "email": email }), None)
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let reset = app
        .wait_for_subject(email, "Password Reset Instructions")
        .await;
    let path = link_path(&reset, "reset-password/");
    let mut parts = path.trim_start_matches('/').split('/').skip(1);
    (
        parts.next().unwrap().to_owned(),
        parts.next().unwrap().to_owned(),
    )
}

#[tokio::test]
async fn test_reset_request_for_unknown_email_is_accepted_silently() {
    let app = TestApp::spawn();

    let response = app
        .post_json(
            "/password-reset/request",
            &json!({ "email": "nobody@example.com" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_reset_replaces_password() {
    let app = TestApp::spawn();
    app.seed_user("jane@example.com", UserRole::Authenticated).await;
    let (user_id, token) = reset_link(&app, "jane@example.com").await;

    let response = app
        .post_json(
            "/password-reset/confirm",
            &json!({ "user_id": user_id, "token": token, "new_password": NEW_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        app.login("jane@example.com", PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("jane@example.com", NEW_PASSWORD).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let app = TestApp::spawn();
    app.seed_user("jane@example.com", UserRole::Authenticated).await;
    let (user_id, token) = reset_link(&app, "jane@example.com").await;
    let body = json!({ "user_id": user_id, "token": token, "new_password": NEW_PASSWORD });

    let first = app.post_json("/password-reset/confirm", &body, None).await;
    let replay = app.post_json("/password-reset/confirm", &body, None).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.detail(), "Invalid or expired password reset token");
}

#[tokio::test]
async fn test_reset_rejects_weak_password_and_keeps_token() {
    let app = TestApp::spawn();
    app.seed_user("jane@example.com", UserRole::Authenticated).await;
    let (user_id, token) = reset_link(&app, "jane@example.com").await;

    let weak = app
        .post_json(
            "/password-reset/confirm",
            &json!({ "user_id": user_id, "token": token, "new_password": "short" }),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::UNPROCESSABLE_ENTITY);

    let strong = app
        .post_json(
            "/password-reset/confirm",
            &json!({ "user_id": user_id, "token": token, "new_password": NEW_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(strong.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_does_not_clear_lockout() {
    let app = TestApp::spawn();
    let user = app.seed_user("jane@example.com", UserRole::Authenticated).await;
    for _ in 0..MAX_LOGIN_ATTEMPTS {
        app.login("jane@example.com", "Wr0ng!Password").await;
    }
    let (user_id, token) = reset_link(&app, "jane@example.com").await;

    app.post_json(
        "/password-reset/confirm",
        &json!({ "user_id": user_id, "token": token, "new_password": NEW_PASSWORD }),
        None,
    )
    .await;

    assert!(app.user(user.id).await.unwrap().is_locked);
    assert_eq!(
        app.login("jane@example.com", NEW_PASSWORD).await.status,
        StatusCode::BAD_REQUEST
    );
}
