//! Per-user dashboard shares.
//!
//! Managing shares takes the `dashboard_creator` role and being the creator
//! of the dashboard in question. Re-sharing with the same user replaces the
//! grant's level and keeps its id.
use crate::api::dashboards::load_dashboard;
use crate::api::error::{ApiError, api_forbidden, api_internal, api_invalid_field, api_not_found};
use crate::api::parse_id;
use crate::api::types::{ShareListResponse, ShareRequest};
use crate::api::validation::parse_json;
use crate::app::AppState;
use crate::auth::gate;
use crate::model::{Dashboard, DashboardShare};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use tessera_authz::{Identity, Operation, ShareId, UserId};

fn ensure_creator(dashboard: &Dashboard, identity: &Identity) -> Result<(), ApiError> {
    if dashboard.created_by == identity.user_id {
        Ok(())
    } else {
        tracing::info!(
            dashboard_id = %dashboard.id,
            actor = %identity.user_id,
            "rejected share management by non-creator"
        );
        Err(api_forbidden("Only the dashboard creator can manage shares"))
    }
}

#[utoipa::path(
    get,
    path = "/v1/dashboards/{dashboard_id}/shares",
    tag = "shares",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    responses(
        (status = 200, description = "Explicit grants on the dashboard", body = ShareListResponse),
        (status = 403, description = "Caller is not the creator", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Dashboard not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_shares(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ShareListResponse>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageShares).await?;
    let dashboard = load_dashboard(&state, &dashboard_id).await?;
    ensure_creator(&dashboard, &identity)?;
    let shares = state
        .store
        .list_shares(&dashboard.id)
        .await
        .map_err(|err| api_internal("failed to list shares", &err))?;
    Ok(Json(shares.into()))
}

#[utoipa::path(
    post,
    path = "/v1/dashboards/{dashboard_id}/shares",
    tag = "shares",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    request_body = ShareRequest,
    responses(
        (status = 201, description = "New grant", body = DashboardShare),
        (status = 200, description = "Existing grant updated in place", body = DashboardShare),
        (status = 400, description = "Invalid input or unknown grantee", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller is not the creator", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Dashboard not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn share_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DashboardShare>), ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageShares).await?;
    let request: ShareRequest = parse_json(&body)?;
    let dashboard = load_dashboard(&state, &dashboard_id).await?;
    ensure_creator(&dashboard, &identity)?;
    match state.store.get_user(&request.user_id).await {
        Ok(_) => {}
        Err(StoreError::NotFound(_)) => {
            return Err(api_invalid_field("userId", "user does not exist"));
        }
        Err(err) => return Err(api_internal("failed to load grantee", &err)),
    }

    let share = DashboardShare {
        id: ShareId::new(),
        dashboard_id: dashboard.id,
        user_id: request.user_id,
        access_level: request.access_level,
        created_by: identity.user_id,
        created_at: Utc::now(),
    };
    let outcome = match state.store.upsert_share(share).await {
        Ok(outcome) => outcome,
        Err(StoreError::NotFound(_)) => return Err(api_not_found()),
        Err(err) => return Err(api_internal("failed to store share", &err)),
    };
    tracing::info!(
        dashboard_id = %dashboard.id,
        grantee = %outcome.share.user_id,
        level = ?outcome.share.access_level,
        created = outcome.created,
        "shared dashboard"
    );
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.share)))
}

#[utoipa::path(
    delete,
    path = "/v1/dashboards/{dashboard_id}/shares/{user_id}",
    tag = "shares",
    params(
        ("dashboard_id" = String, Path, description = "Dashboard identifier"),
        ("user_id" = String, Path, description = "Grantee")
    ),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 403, description = "Caller is not the creator", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Dashboard or grant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn revoke_share(
    Path((dashboard_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageShares).await?;
    let dashboard = load_dashboard(&state, &dashboard_id).await?;
    let grantee: UserId = parse_id(&user_id)?;
    ensure_creator(&dashboard, &identity)?;
    match state.store.delete_share(&dashboard.id, &grantee).await {
        Ok(()) => {
            tracing::info!(dashboard_id = %dashboard.id, grantee = %grantee, "revoked share");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to revoke share", &err)),
    }
}
