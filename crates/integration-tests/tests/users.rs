//! Integration tests for role-gated user management.

use axum::http::{StatusCode, header};
use serde_json::{Value, json};

use accounts_api::db::UserStore;
use accounts_core::{Email, UserRole};
use accounts_integration_tests::{PASSWORD, TestApp};

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_401_with_challenge() {
    let app = TestApp::spawn();

    let response = app.get("/users/", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.detail(), "Could not validate credentials");
    assert_eq!(
        response.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let app = TestApp::spawn();

    let response = app.get("/users/", Some("not.a.jwt")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authenticated users
// =============================================================================

#[tokio::test]
async fn test_authenticated_user_reads_and_updates_own_record() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;

    let read = app.get(&format!("/users/{}", me.id), Some(&token)).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["email"], "jane@example.com");

    let update = app
        .put_json(
            &format!("/users/{}", me.id),
            &json!({ "first_name": "Jane", "bio": "Hello" }),
            Some(&token),
        )
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(update.body["first_name"], "Jane");
    assert_eq!(update.body["bio"], "Hello");
}

#[tokio::test]
async fn test_authenticated_user_cannot_touch_others() {
    let app = TestApp::spawn();
    let (_, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;
    let other = app.seed_user("john@example.com", UserRole::Authenticated).await;
    let path = format!("/users/{}", other.id);

    assert_eq!(app.get(&path, Some(&token)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.put_json(&path, &json!({ "bio": "x" }), Some(&token))
            .await
            .status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(app.delete(&path, Some(&token)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/users/", Some(&token)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_authenticated_user_cannot_create_users() {
    let app = TestApp::spawn();
    let (_, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;

    let response = app
        .post_json(
            "/users/",
            &json!({ "email": "new@example.com", "password": PASSWORD }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.detail(), "Operation not permitted");
    let email = Email::parse("new@example.com").unwrap();
    assert!(app.store.get_by_email(&email).await.unwrap().is_none());
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_authenticated_user_cannot_change_own_role() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;

    let response = app
        .put_json(
            &format!("/users/{}", me.id),
            &json!({ "role": "ADMIN" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.user(me.id).await.unwrap().role, UserRole::Authenticated);
}

#[tokio::test]
async fn test_profile_urls_are_validated() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;
    let path = format!("/users/{}", me.id);

    let valid = app
        .put_json(
            &path,
            &json!({
                "github_profile_url": "https://github.com/jane",
                "linkedin_profile_url": "https://www.linkedin.com/in/jane"
            }),
            Some(&token),
        )
        .await;
    assert_eq!(valid.status, StatusCode::OK);
    assert_eq!(valid.body["github_profile_url"], "https://github.com/jane");
    assert_eq!(
        valid.body["linkedin_profile_url"],
        "https://www.linkedin.com/in/jane"
    );

    let invalid = app
        .put_json(
            &path,
            &json!({ "github_profile_url": "ftp://github.com/jane" }),
            Some(&token),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_oversized_fields_are_422() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;
    let path = format!("/users/{}", me.id);

    let long_url = format!("https://github.com/{}", "a".repeat(300));
    for body in [
        json!({ "first_name": "J".repeat(101) }),
        json!({ "last_name": "D".repeat(101) }),
        json!({ "profile_picture_url": long_url }),
    ] {
        let response = app.put_json(&path, &body, Some(&token)).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    }

    let fits = app
        .put_json(&path, &json!({ "first_name": "J".repeat(100) }), Some(&token))
        .await;
    assert_eq!(fits.status, StatusCode::OK);
    assert_eq!(app.user(me.id).await.unwrap().first_name.unwrap().len(), 100);
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;

    let response = app
        .put_json(&format!("/users/{}", me.id), &json!({}), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_to_taken_email_is_rejected() {
    let app = TestApp::spawn();
    let (me, token) = app
        .seed_and_login("jane@example.com", UserRole::Authenticated)
        .await;
    app.seed_user("john@example.com", UserRole::Authenticated).await;

    let response = app
        .put_json(
            &format!("/users/{}", me.id),
            &json!({ "email": "john@example.com" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "Email already exists");
}

// =============================================================================
// Managers
// =============================================================================

#[tokio::test]
async fn test_manager_lists_with_pagination() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;
    for name in ["anna", "bert", "cleo", "dave"] {
        app.seed_user(&format!("{name}@example.com"), UserRole::Authenticated)
            .await;
    }

    let page = app.get("/users/?skip=1&limit=2", Some(&token)).await;

    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["total"], 5);
    assert_eq!(page.body["skip"], 1);
    assert_eq!(page.body["limit"], 2);
    assert_eq!(page.body["items"].as_array().unwrap().len(), 2);

    let defaults = app.get("/users", Some(&token)).await;
    assert_eq!(defaults.body["skip"], 0);
    assert_eq!(defaults.body["limit"], 10);
    assert_eq!(defaults.body["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_invalid_pagination_is_422() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;

    for query in ["limit=0", "limit=101", "skip=-1", "skip=abc"] {
        let response = app.get(&format!("/users/?{query}"), Some(&token)).await;
        assert_eq!(
            response.status,
            StatusCode::UNPROCESSABLE_ENTITY,
            "query {query}"
        );
    }
}

#[tokio::test]
async fn test_manager_updates_others_but_cannot_delete_or_promote() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;
    let user = app.seed_user("jane@example.com", UserRole::Authenticated).await;
    let path = format!("/users/{}", user.id);

    let update = app
        .put_json(&path, &json!({ "last_name": "Doe" }), Some(&token))
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(update.body["last_name"], "Doe");

    let promote = app
        .put_json(&path, &json!({ "role": "MANAGER" }), Some(&token))
        .await;
    assert_eq!(promote.status, StatusCode::FORBIDDEN);

    assert_eq!(app.delete(&path, Some(&token)).await.status, StatusCode::FORBIDDEN);
    assert!(app.user(user.id).await.is_some());
}

#[tokio::test]
async fn test_manager_cannot_create_privileged_users() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;

    let response = app
        .post_json(
            "/users/",
            &json!({ "email": "new@example.com", "password": PASSWORD, "role": "ADMIN" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manager_cannot_modify_privileged_records() {
    let app = TestApp::spawn();
    let admin = app.seed_user("admin@example.com", UserRole::Admin).await;
    let peer = app.seed_user("peer@example.com", UserRole::Manager).await;
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;

    for target in [&admin, &peer] {
        let response = app
            .put_json(
                &format!("/users/{}", target.id),
                &json!({ "email": "boss-inbox@example.com" }),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(app.user(target.id).await.unwrap().email, target.email);
    }

    // Reading stays allowed
    let read = app.get(&format!("/users/{}", admin.id), Some(&token)).await;
    assert_eq!(read.status, StatusCode::OK);
}

#[tokio::test]
async fn test_manager_cannot_redirect_admin_password_reset() {
    let app = TestApp::spawn();
    let admin = app.seed_user("admin@example.com", UserRole::Admin).await;
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;

    app.put_json(
        &format!("/users/{}", admin.id),
        &json!({ "email": "boss-inbox@example.com" }),
        Some(&token),
    )
    .await;
    let reset = app
        .post_json(
            "/password-reset/request",
            &json!({ "email": "boss-inbox@example.com" }),
            None,
        )
        .await;

    assert_eq!(reset.status, StatusCode::ACCEPTED);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(app.mailer.sent_to("boss-inbox@example.com").is_empty());
    assert!(app.user(admin.id).await.unwrap().password_reset_token.is_none());
}

#[tokio::test]
async fn test_manager_updating_missing_user_is_404() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("boss@example.com", UserRole::Manager).await;

    let response = app
        .put_json(
            "/users/00000000-0000-4000-8000-000000000000",
            &json!({ "bio": "x" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Admins
// =============================================================================

#[tokio::test]
async fn test_admin_creates_user_with_role() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("admin@example.com", UserRole::Admin).await;

    let response = app
        .post_json(
            "/users/",
            &json!({ "email": "boss@example.com", "password": PASSWORD, "role": "MANAGER" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "MANAGER");
    assert_eq!(response.body["email_verified"], true);
    assert_eq!(
        app.login("boss@example.com", PASSWORD).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_admin_created_user_without_role_must_verify() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("admin@example.com", UserRole::Admin).await;

    let response = app
        .post_json(
            "/users/",
            &json!({ "email": "jane@example.com", "password": PASSWORD }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "ANONYMOUS");
    app.wait_for_subject("jane@example.com", "Verify Your Account")
        .await;
}

#[tokio::test]
async fn test_admin_changes_role() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("admin@example.com", UserRole::Admin).await;
    let user = app.seed_user("jane@example.com", UserRole::Authenticated).await;

    let response = app
        .put_json(
            &format!("/users/{}", user.id),
            &json!({ "role": "MANAGER" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["role"], "MANAGER");
}

#[tokio::test]
async fn test_admin_deletes_user() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("admin@example.com", UserRole::Admin).await;
    let user = app.seed_user("jane@example.com", UserRole::Authenticated).await;
    let path = format!("/users/{}", user.id);

    let deleted = app.delete(&path, Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.body, Value::Null);

    assert_eq!(app.get(&path, Some(&token)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&path, Some(&token)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.login("jane@example.com", PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_admin_reads_unknown_user_as_404() {
    let app = TestApp::spawn();
    let (_, token) = app.seed_and_login("admin@example.com", UserRole::Admin).await;

    let response = app
        .get(
            "/users/00000000-0000-4000-8000-000000000000",
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn();

    let live = app.get("/health", None).await;
    let ready = app.get("/health/ready", None).await;

    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(ready.status, StatusCode::OK);
}
