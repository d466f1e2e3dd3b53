//! User role administration.
//!
//! Restricted to `user_admin`. There is no self-protection: an admin may
//! remove their own `user_admin` role.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::parse_id;
use crate::api::types::{RolesUpdateRequest, UserListResponse};
use crate::api::validation::parse_json;
use crate::app::AppState;
use crate::auth::gate;
use crate::model::User;
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::Utc;
use tessera_authz::{Operation, RoleSet, UserId};

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "admin",
    operation_id = "admin_list_users",
    responses(
        (status = 200, description = "Every user with roles", body = UserListResponse),
        (status = 403, description = "Caller lacks user_admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::AdministerUsers).await?;
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list users", &err))?;
    Ok(Json(
        users.iter().map(|user| user.view()).collect::<Vec<_>>().into(),
    ))
}

#[utoipa::path(
    put,
    path = "/v1/admin/users/{user_id}/roles",
    tag = "admin",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = RolesUpdateRequest,
    responses(
        (status = 200, description = "User with the new role set", body = User),
        (status = 400, description = "Unknown role", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks user_admin", body = crate::api::types::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_roles(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let admin = gate::require(&state, &headers, Operation::AdministerUsers).await?;
    let request: RolesUpdateRequest = parse_json(&body)?;
    let user_id: UserId = parse_id(&user_id)?;

    let mut user = match state.store.get_user(&user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(api_not_found()),
        Err(err) => return Err(api_internal("failed to load user", &err)),
    };
    let roles: RoleSet = request.roles.into_iter().collect();
    tracing::info!(
        admin = %admin.user_id,
        target = %user.id,
        from = %user.roles,
        to = %roles,
        "updating user roles"
    );
    user.roles = roles;
    user.updated_at = Utc::now();
    let user = match state.store.update_user(user).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(api_not_found()),
        Err(err) => return Err(api_internal("failed to update user roles", &err)),
    };
    Ok(Json(user.view()))
}
