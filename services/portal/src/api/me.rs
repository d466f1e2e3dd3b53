//! Profile self-service. The target is always the caller.
use crate::api::auth::{password_failure, validate_new_password};
use crate::api::error::{ApiError, api_forbidden_bare, api_internal, api_not_found};
use crate::api::types::{PasswordChangeRequest, ProfilePatchRequest};
use crate::api::validation::{Issues, parse_json};
use crate::app::AppState;
use crate::auth::gate;
use crate::auth::password;
use crate::model::{User, UserRecord};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use tessera_authz::{Identity, Operation};

async fn load_self(state: &AppState, identity: &Identity) -> Result<UserRecord, ApiError> {
    match state.store.get_user(&identity.user_id).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to load user", &err)),
    }
}

async fn save_self(state: &AppState, user: UserRecord) -> Result<UserRecord, ApiError> {
    state
        .store
        .update_user(user)
        .await
        .map_err(|err| api_internal("failed to update user", &err))
}

/// Blank optional fields clear the stored value.
fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "me",
    responses(
        (status = 200, description = "The caller's profile", body = User),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    Ok(Json(load_self(&state, &identity).await?.view()))
}

#[utoipa::path(
    patch,
    path = "/v1/me",
    tag = "me",
    request_body = ProfilePatchRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let patch: ProfilePatchRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    if let Some(first_name) = &patch.first_name {
        issues.non_empty("firstName", first_name);
    }
    if let Some(last_name) = &patch.last_name {
        issues.non_empty("lastName", last_name);
    }
    issues.finish()?;

    let mut user = load_self(&state, &identity).await?;
    if let Some(first_name) = patch.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = patch.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(middle_name) = patch.middle_name {
        user.middle_name = optional(middle_name);
    }
    if let Some(organization) = patch.organization {
        user.organization = optional(organization);
    }
    if let Some(department) = patch.department {
        user.department = optional(department);
    }
    user.updated_at = Utc::now();
    Ok(Json(save_self(&state, user).await?.view()))
}

#[utoipa::path(
    post,
    path = "/v1/me/password",
    tag = "me",
    request_body = PasswordChangeRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Current password is wrong", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let request: PasswordChangeRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    validate_new_password(&mut issues, "newPassword", &request.new_password);
    issues.finish()?;

    let mut user = load_self(&state, &identity).await?;
    let matches = password::verify_password(request.current_password, user.password_hash.clone())
        .await
        .map_err(password_failure)?;
    if !matches {
        tracing::info!(user_id = %user.id, "password change with wrong current password");
        return Err(api_forbidden_bare());
    }
    user.password_hash = password::hash_password(request.new_password)
        .await
        .map_err(password_failure)?;
    user.updated_at = Utc::now();
    save_self(&state, user).await?;
    Ok(StatusCode::NO_CONTENT)
}
