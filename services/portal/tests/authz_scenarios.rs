mod common;
mod http_helpers;

use axum::http::StatusCode;
use common::{Harness, TestApp, read_json};
use http_helpers::{anonymous, authed, authed_json, json_request};
use serde_json::{Value, json};
use tessera_authz::Role;
use tower::ServiceExt;

fn connection_body(name: &str) -> Value {
    json!({
        "name": name,
        "type": "postgresql",
        "host": "db.internal",
        "port": 5432,
        "database": "plant",
        "username": "reader",
        "password": "s3cret"
    })
}

async fn send(app: &TestApp, request: axum::http::Request<axum::body::Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.expect("response")
}

#[tokio::test]
async fn user_without_roles_cannot_create_connection() {
    let harness = Harness::new();
    let app = harness.app();
    let nobody = harness.user("nobody@example.com", &[]).await;

    let response = send(
        &app,
        authed_json("POST", "/v1/database-connections", &nobody.token, connection_body("plant")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(
        body["message"],
        "Required role: db_admin, but user has: none"
    );
}

#[tokio::test]
async fn public_role_alone_grants_nothing() {
    let harness = Harness::new();
    let app = harness.app();
    let viewer = harness.user("viewer@example.com", &[Role::Public]).await;

    let response = send(&app, authed("GET", "/v1/data-sources", &viewer.token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(
        body["message"],
        "Required role: metadata_editor, but user has: public"
    );
}

#[tokio::test]
async fn anonymous_caller_is_rejected_before_body_validation() {
    let harness = Harness::new();
    let app = harness.app();

    let response = send(
        &app,
        json_request("POST", "/v1/database-connections", json!({"garbage": true})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await, json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn forged_token_is_treated_as_anonymous() {
    let harness = Harness::new();
    let app = harness.app();

    let response = send(&app, authed("GET", "/v1/groups", "not.a.jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn restricted_dashboard_is_hidden_from_anonymous_callers() {
    let harness = Harness::new();
    let app = harness.app();
    let creator = harness
        .user("creator@example.com", &[Role::DashboardCreator])
        .await;

    let response = send(
        &app,
        authed_json(
            "POST",
            "/v1/dashboards",
            &creator.token,
            json!({"title": "Private board", "isPublic": false}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let dashboard_id = read_json(response).await["id"].as_str().expect("id").to_string();

    let listing = read_json(send(&app, anonymous("GET", "/v1/dashboards")).await).await;
    assert_eq!(listing["items"], json!([]));

    let direct = send(&app, anonymous("GET", &format!("/v1/dashboards/{dashboard_id}"))).await;
    assert_eq!(direct.status(), StatusCode::NOT_FOUND);

    let public_view = send(
        &app,
        anonymous("GET", &format!("/v1/public/dashboards/{dashboard_id}")),
    )
    .await;
    assert_eq!(public_view.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        public_view.headers().get("location").expect("location"),
        "/login"
    );
}

#[tokio::test]
async fn any_db_admin_may_update_another_admins_connection() {
    let harness = Harness::new();
    let app = harness.app();
    let alice = harness.user("alice@example.com", &[Role::DbAdmin]).await;
    let bob = harness.user("bob@example.com", &[Role::DbAdmin]).await;

    let created = send(
        &app,
        authed_json("POST", "/v1/database-connections", &alice.token, connection_body("plant")),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = read_json(created).await["id"].as_str().expect("id").to_string();

    let updated = send(
        &app,
        authed_json(
            "PATCH",
            &format!("/v1/database-connections/{id}"),
            &bob.token,
            json!({"name": "plant-replica"}),
        ),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let body = read_json(updated).await;
    assert_eq!(body["name"], "plant-replica");
    assert_eq!(body["createdBy"], json!(alice.id));
}

#[tokio::test]
async fn edit_group_member_gets_edit_access() {
    let harness = Harness::new();
    let app = harness.app();
    let owner = harness.user("owner@example.com", &[]).await;
    let member = harness.user("member@example.com", &[]).await;
    let creator = harness
        .user("creator@example.com", &[Role::DashboardCreator])
        .await;

    let group = send(
        &app,
        authed_json(
            "POST",
            "/v1/groups",
            &owner.token,
            json!({"name": "Operators", "role": "edit", "memberIds": [member.id, member.id]}),
        ),
    )
    .await;
    assert_eq!(group.status(), StatusCode::CREATED);
    let group = read_json(group).await;
    assert_eq!(group["memberIds"], json!([member.id]));
    let group_id = group["id"].as_str().expect("id").to_string();

    let dashboard = send(
        &app,
        authed_json(
            "POST",
            "/v1/dashboards",
            &creator.token,
            json!({"title": "Line 3", "groupIds": [group_id]}),
        ),
    )
    .await;
    assert_eq!(dashboard.status(), StatusCode::CREATED);
    let dashboard_id = read_json(dashboard).await["id"].as_str().expect("id").to_string();

    let fetched = send(
        &app,
        authed("GET", &format!("/v1/dashboards/{dashboard_id}"), &member.token),
    )
    .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(read_json(fetched).await["accessLevel"], "edit");

    // Membership is read through: removing the member revokes access at once.
    let patched = send(
        &app,
        authed_json(
            "PATCH",
            &format!("/v1/groups/{group_id}"),
            &owner.token,
            json!({"memberIds": []}),
        ),
    )
    .await;
    assert_eq!(patched.status(), StatusCode::OK);
    let hidden = send(
        &app,
        authed("GET", &format!("/v1/dashboards/{dashboard_id}"), &member.token),
    )
    .await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_owner_cannot_touch_group_even_with_every_role() {
    let harness = Harness::new();
    let app = harness.app();
    let owner = harness.user("owner@example.com", &[]).await;
    let admin = harness
        .user(
            "admin@example.com",
            &[
                Role::DbAdmin,
                Role::MetadataEditor,
                Role::DashboardCreator,
                Role::UserAdmin,
                Role::Public,
            ],
        )
        .await;

    let group = send(
        &app,
        authed_json(
            "POST",
            "/v1/groups",
            &owner.token,
            json!({"name": "Owners only", "role": "view"}),
        ),
    )
    .await;
    let group_id = read_json(group).await["id"].as_str().expect("id").to_string();

    let deleted = send(
        &app,
        authed("DELETE", &format!("/v1/groups/{group_id}"), &admin.token),
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::NOT_FOUND);

    let fetched = send(&app, authed("GET", &format!("/v1/groups/{group_id}"), &admin.token)).await;
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);

    let listing = read_json(send(&app, authed("GET", "/v1/groups", &admin.token)).await).await;
    assert_eq!(listing["items"], json!([]));

    let still_there = send(&app, authed("GET", &format!("/v1/groups/{group_id}"), &owner.token)).await;
    assert_eq!(still_there.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_changes_apply_to_the_next_request() {
    let harness = Harness::new();
    let app = harness.app();
    let admin = harness.user("admin@example.com", &[Role::UserAdmin]).await;
    let target = harness.user("target@example.com", &[]).await;

    let denied = send(&app, authed("GET", "/v1/database-connections", &target.token)).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let updated = send(
        &app,
        authed_json(
            "PUT",
            &format!("/v1/admin/users/{}/roles", target.id),
            &admin.token,
            json!({"roles": ["db_admin", "db_admin", "public"]}),
        ),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(read_json(updated).await["roles"], json!(["db_admin", "public"]));

    let allowed = send(&app, authed("GET", "/v1/database-connections", &target.token)).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}
