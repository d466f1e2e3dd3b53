mod common;
mod http_helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Harness, TestApp, read_json};
use http_helpers::{anonymous, authed, authed_json, json_request};
use serde_json::json;
use tessera_authz::Role;
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.expect("response")
}

async fn register(app: &TestApp, email: &str, password: &str) -> axum::response::Response {
    send(
        app,
        json_request(
            "POST",
            "/v1/auth/register",
            json!({
                "email": email,
                "password": password,
                "firstName": "Ada",
                "lastName": "Lovelace"
            }),
        ),
    )
    .await
}

async fn login(app: &TestApp, email: &str, password: &str) -> axum::response::Response {
    send(
        app,
        json_request("POST", "/v1/auth/login", json!({"email": email, "password": password})),
    )
    .await
}

#[tokio::test]
async fn register_login_and_read_profile() {
    let harness = Harness::new();
    let app = harness.app();

    let created = register(&app, "Ada@Example.com", "analytical-engine").await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let user = read_json(created).await;
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["roles"], json!(["public"]));
    assert!(user.get("passwordHash").is_none());

    let duplicate = register(&app, "ada@example.com", "another-password").await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(duplicate).await["error"], "Conflict");

    let session = login(&app, "ADA@example.com", "analytical-engine").await;
    assert_eq!(session.status(), StatusCode::OK);
    let session = read_json(session).await;
    let token = session["token"].as_str().expect("token").to_string();
    assert_eq!(session["user"]["id"], user["id"]);

    let me = send(&app, authed("GET", "/v1/me", &token)).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(read_json(me).await["firstName"], "Ada");
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password_alike() {
    let harness = Harness::new();
    let app = harness.app();
    register(&app, "ada@example.com", "analytical-engine").await;

    let wrong = login(&app, "ada@example.com", "difference-engine").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let unknown = login(&app, "charles@example.com", "analytical-engine").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(wrong).await, read_json(unknown).await);
}

#[tokio::test]
async fn registration_reports_field_issues() {
    let harness = Harness::new();
    let app = harness.app();

    let response = register(&app, "not-an-email", "short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    let fields: Vec<&str> = body["details"]
        .as_array()
        .expect("details")
        .iter()
        .map(|issue| issue["field"].as_str().expect("field"))
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn profile_patch_and_password_change() {
    let harness = Harness::new();
    let app = harness.app();
    register(&app, "ada@example.com", "analytical-engine").await;
    let token = read_json(login(&app, "ada@example.com", "analytical-engine").await).await["token"]
        .as_str()
        .expect("token")
        .to_string();

    let patched = send(
        &app,
        authed_json(
            "PATCH",
            "/v1/me",
            &token,
            json!({"organization": "Analytical Society", "department": ""}),
        ),
    )
    .await;
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = read_json(patched).await;
    assert_eq!(patched["organization"], "Analytical Society");
    assert_eq!(patched["department"], serde_json::Value::Null);

    let wrong_current = send(
        &app,
        authed_json(
            "POST",
            "/v1/me/password",
            &token,
            json!({"currentPassword": "nope-nope-nope", "newPassword": "difference-engine"}),
        ),
    )
    .await;
    assert_eq!(wrong_current.status(), StatusCode::FORBIDDEN);

    let changed = send(
        &app,
        authed_json(
            "POST",
            "/v1/me/password",
            &token,
            json!({"currentPassword": "analytical-engine", "newPassword": "difference-engine"}),
        ),
    )
    .await;
    assert_eq!(changed.status(), StatusCode::NO_CONTENT);

    let old = login(&app, "ada@example.com", "analytical-engine").await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
    let new = login(&app, "ada@example.com", "difference-engine").await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_roster_needs_a_session_and_admin_roster_needs_user_admin() {
    let harness = Harness::new();
    let app = harness.app();
    let member = harness.user("member@example.com", &[Role::Public]).await;
    let admin = harness.user("admin@example.com", &[Role::UserAdmin]).await;

    let anon = send(&app, anonymous("GET", "/v1/users")).await;
    assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

    let roster = send(&app, authed("GET", "/v1/users", &member.token)).await;
    assert_eq!(roster.status(), StatusCode::OK);
    let roster = read_json(roster).await;
    assert_eq!(roster["items"].as_array().expect("items").len(), 2);
    assert!(roster["items"][0].get("passwordHash").is_none());

    let denied = send(&app, authed("GET", "/v1/admin/users", &member.token)).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let allowed = send(&app, authed("GET", "/v1/admin/users", &admin.token)).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_update_rejects_unknown_roles_and_missing_users() {
    let harness = Harness::new();
    let app = harness.app();
    let admin = harness.user("admin@example.com", &[Role::UserAdmin]).await;

    let unknown_role = send(
        &app,
        authed_json(
            "PUT",
            &format!("/v1/admin/users/{}/roles", admin.id),
            &admin.token,
            json!({"roles": ["root"]}),
        ),
    )
    .await;
    assert_eq!(unknown_role.status(), StatusCode::BAD_REQUEST);

    let missing = send(
        &app,
        authed_json(
            "PUT",
            &format!("/v1/admin/users/{}/roles", tessera_authz::UserId::new()),
            &admin.token,
            json!({"roles": ["public"]}),
        ),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // No self-protection: an admin may drop their own user_admin role.
    let demoted = send(
        &app,
        authed_json(
            "PUT",
            &format!("/v1/admin/users/{}/roles", admin.id),
            &admin.token,
            json!({"roles": []}),
        ),
    )
    .await;
    assert_eq!(demoted.status(), StatusCode::OK);
    let after = send(&app, authed("GET", "/v1/admin/users", &admin.token)).await;
    assert_eq!(after.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn system_endpoints_are_open() {
    let harness = Harness::new();
    let app = harness.app();

    let info = send(&app, anonymous("GET", "/v1/system/info")).await;
    assert_eq!(info.status(), StatusCode::OK);
    let info = read_json(info).await;
    assert_eq!(info["storageBackend"], "memory");
    assert_eq!(info["durableStorage"], false);

    let health = send(&app, anonymous("GET", "/v1/system/health")).await;
    assert_eq!(health.status(), StatusCode::OK);

    let docs = send(&app, anonymous("GET", "/v1/openapi.json")).await;
    assert_eq!(docs.status(), StatusCode::OK);
}
