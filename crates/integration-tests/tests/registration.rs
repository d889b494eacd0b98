//! Integration tests for registration and email verification.

use axum::http::StatusCode;
use serde_json::json;

use accounts_api::db::UserStore;
use accounts_core::UserRole;
use accounts_integration_tests::{PASSWORD, TestApp, link_path};

// =============================================================================
// Bootstrap
// =============================================================================

#[tokio::test]
async fn test_first_user_becomes_verified_admin() {
    let app = TestApp::spawn();

    let response = app.register("founder@example.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "ADMIN");
    assert_eq!(response.body["email_verified"], true);
    assert!(response.body.get("hashed_password").is_none());

    // No verification email for the bootstrap admin
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(app.mailer.sent().is_empty());

    let login = app.login("founder@example.com", PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["token_type"], "bearer");
}

// =============================================================================
// Verification lifecycle
// =============================================================================

#[tokio::test]
async fn test_later_users_start_anonymous_and_receive_verification_email() {
    let app = TestApp::spawn();
    app.seed_user("admin@example.com", UserRole::Admin).await;

    let response = app.register("jane@example.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "ANONYMOUS");
    assert_eq!(response.body["email_verified"], false);

    let mail = app.wait_for_mail("jane@example.com", 1).await;
    assert_eq!(mail[0].subject, "Verify Your Account");
    assert!(mail[0].text.contains("http://localhost:8000/verify-email/"));
}

#[tokio::test]
async fn test_unverified_user_cannot_log_in() {
    let app = TestApp::spawn();
    app.seed_user("admin@example.com", UserRole::Admin).await;
    app.register("jane@example.com", PASSWORD).await;

    let login = app.login("jane@example.com", PASSWORD).await;

    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    assert_eq!(login.detail(), "Incorrect email or password.");
}

#[tokio::test]
async fn test_verification_link_promotes_and_enables_login() {
    let app = TestApp::spawn();
    app.seed_user("admin@example.com", UserRole::Admin).await;
    app.register("jane@example.com", PASSWORD).await;

    let mail = app.wait_for_mail("jane@example.com", 1).await;
    let path = link_path(&mail[0], "verify-email/");
    let verified = app.get(&path, None).await;

    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["message"], "Email verified successfully");

    let token = app.token("jane@example.com", PASSWORD).await;
    let id = path.split('/').nth(2).unwrap();
    let me = app.get(&format!("/users/{id}"), Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["role"], "AUTHENTICATED");
    assert_eq!(me.body["email_verified"], true);
}

#[tokio::test]
async fn test_verification_link_is_single_use() {
    let app = TestApp::spawn();
    app.seed_user("admin@example.com", UserRole::Admin).await;
    app.register("jane@example.com", PASSWORD).await;

    let mail = app.wait_for_mail("jane@example.com", 1).await;
    let path = link_path(&mail[0], "verify-email/");

    assert_eq!(app.get(&path, None).await.status, StatusCode::OK);

    let replay = app.get(&path, None).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.detail(), "Invalid or expired verification token");
}

#[tokio::test]
async fn test_verification_with_wrong_token_is_rejected() {
    let app = TestApp::spawn();
    app.seed_user("admin@example.com", UserRole::Admin).await;
    let response = app.register("jane@example.com", PASSWORD).await;
    let id = response.body["id"].as_str().unwrap();

    let verified = app
        .get(&format!("/verify-email/{id}/not-the-token"), None)
        .await;

    assert_eq!(verified.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.login("jane@example.com", PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_verification_with_malformed_id_is_422() {
    let app = TestApp::spawn();

    let response = app.get("/verify-email/not-a-uuid/token", None).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Validation and uniqueness
// =============================================================================

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::spawn();
    app.register("jane@example.com", PASSWORD).await;

    let duplicate = app.register("jane@example.com", PASSWORD).await;

    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.detail(), "Email already exists");
}

#[tokio::test]
async fn test_duplicate_nickname_is_rejected() {
    let app = TestApp::spawn();
    let body = |email: &str| {
        json!({ "email": email, "password": PASSWORD, "nickname": "janedoe" })
    };
    let first = app.post_json("/register/", &body("jane@example.com"), None).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["nickname"], "janedoe");

    let duplicate = app.post_json("/register/", &body("john@example.com"), None).await;

    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.detail(), "Nickname already exists");
}

#[tokio::test]
async fn test_nickname_is_generated_when_omitted() {
    let app = TestApp::spawn();

    let response = app.register("jane@example.com", PASSWORD).await;

    let nickname = response.body["nickname"].as_str().unwrap();
    assert_eq!(nickname.split('_').count(), 3);
}

#[tokio::test]
async fn test_weak_password_is_422() {
    let app = TestApp::spawn();

    let response = app.register("jane@example.com", "password").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_email_is_422() {
    let app = TestApp::spawn();

    let response = app.register("not-an-email", PASSWORD).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_accepts_path_without_trailing_slash() {
    let app = TestApp::spawn();

    let response = app
        .post_json(
            "/register",
            &json!({ "email": "jane@example.com", "password": PASSWORD }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
}
