//! Group handlers.
//!
//! Groups are private to their owner: other callers, whatever their roles,
//! get 404 on every by-id route and never see the group in listings. Member
//! lists are de-duplicated on every write.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::parse_id;
use crate::api::types::{GroupCreateRequest, GroupListResponse, GroupPatchRequest};
use crate::api::validation::{Issues, parse_json};
use crate::app::AppState;
use crate::auth::gate;
use crate::model::Group;
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use tessera_authz::{GroupId, Identity, Operation, OwnedResource, can_mutate, can_read, dedup_members};

/// Load a group the caller owns; a foreign group is indistinguishable from a
/// missing one.
async fn load_owned_group(
    state: &AppState,
    identity: &Identity,
    raw_id: &str,
    write: bool,
) -> Result<Group, ApiError> {
    let id: GroupId = parse_id(raw_id)?;
    let group = match state.store.get_group(&id).await {
        Ok(group) => group,
        Err(StoreError::NotFound(_)) => return Err(api_not_found()),
        Err(err) => return Err(api_internal("failed to load group", &err)),
    };
    let resource = OwnedResource::Group {
        owner: &group.owner,
    };
    let allowed = if write {
        can_mutate(resource, identity)
    } else {
        can_read(resource, identity)
    };
    if !allowed {
        tracing::debug!(group_id = %group.id, actor = %identity.user_id, "hid foreign group");
        return Err(api_not_found());
    }
    Ok(group)
}

#[utoipa::path(
    get,
    path = "/v1/groups",
    tag = "groups",
    responses(
        (status = 200, description = "Groups owned by the caller", body = GroupListResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GroupListResponse>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let groups = state
        .store
        .list_groups()
        .await
        .map_err(|err| api_internal("failed to list groups", &err))?;
    let owned: Vec<Group> = groups
        .into_iter()
        .filter(|group| {
            can_read(
                OwnedResource::Group {
                    owner: &group.owner,
                },
                &identity,
            )
        })
        .collect();
    Ok(Json(owned.into()))
}

#[utoipa::path(
    post,
    path = "/v1/groups",
    tag = "groups",
    request_body = GroupCreateRequest,
    responses(
        (status = 201, description = "Group created; the caller owns it", body = Group),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let request: GroupCreateRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    issues.non_empty("name", &request.name);
    issues.finish()?;

    let now = Utc::now();
    let group = Group {
        id: GroupId::new(),
        name: request.name.trim().to_string(),
        description: request.description,
        role: request.role,
        member_ids: dedup_members(request.member_ids),
        owner: identity.user_id,
        created_by: identity.user_id,
        created_at: now,
        updated_at: now,
    };
    let created = state
        .store
        .create_group(group)
        .await
        .map_err(|err| api_internal("failed to create group", &err))?;
    tracing::info!(
        group_id = %created.id,
        owner = %created.owner,
        members = created.member_ids.len(),
        "created group"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/v1/groups/{group_id}",
    tag = "groups",
    params(("group_id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Missing or owned by someone else", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Group>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let group = load_owned_group(&state, &identity, &group_id, false).await?;
    Ok(Json(group))
}

#[utoipa::path(
    patch,
    path = "/v1/groups/{group_id}",
    tag = "groups",
    params(("group_id" = String, Path, description = "Group identifier")),
    request_body = GroupPatchRequest,
    responses(
        (status = 200, description = "Updated group", body = Group),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Missing or owned by someone else", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Group>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let patch: GroupPatchRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    if let Some(name) = &patch.name {
        issues.non_empty("name", name);
    }
    issues.finish()?;

    let mut group = load_owned_group(&state, &identity, &group_id, true).await?;
    if let Some(name) = patch.name {
        group.name = name.trim().to_string();
    }
    if let Some(description) = patch.description {
        group.description = description;
    }
    if let Some(role) = patch.role {
        group.role = role;
    }
    if let Some(member_ids) = patch.member_ids {
        group.member_ids = dedup_members(member_ids);
    }
    group.updated_at = Utc::now();
    match state.store.update_group(group).await {
        Ok(updated) => Ok(Json(updated)),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to update group", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/groups/{group_id}",
    tag = "groups",
    params(("group_id" = String, Path, description = "Group identifier")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Missing or owned by someone else", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let group = load_owned_group(&state, &identity, &group_id, true).await?;
    match state.store.delete_group(&group.id).await {
        Ok(()) => {
            tracing::info!(group_id = %group.id, "deleted group");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to delete group", &err)),
    }
}
