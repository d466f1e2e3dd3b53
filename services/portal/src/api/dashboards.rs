//! Dashboard handlers.
//!
//! # Access model
//! Listing and single reads are open to anonymous callers; what they see is
//! decided per dashboard by the sharing engine against the live group roster
//! and the dashboard's explicit shares. A dashboard the caller cannot see
//! answers 404, never 403, so ids of private boards are not confirmed.
//!
//! Mutation needs a signed-in caller plus effective `edit`; deletion needs
//! creatorship or an explicit `edit` share.
use crate::api::error::{ApiError, api_forbidden, api_internal, api_not_found};
use crate::api::types::{
    DashboardCreateRequest, DashboardListResponse, DashboardPatchRequest, DashboardView,
};
use crate::api::validation::{Issues, parse_json};
use crate::api::{load_roster, parse_id};
use crate::app::AppState;
use crate::auth::gate;
use crate::model::{ChartConfig, Dashboard};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use std::collections::HashSet;
use tessera_authz::{
    AccessDecision, AccessLevel, DashboardId, GroupId, Operation, ShareGrant, SharingEngine, UserId,
    Visibility,
};

pub(crate) async fn load_dashboard(state: &AppState, raw_id: &str) -> Result<Dashboard, ApiError> {
    let id: DashboardId = parse_id(raw_id)?;
    match state.store.get_dashboard(&id).await {
        Ok(dashboard) => Ok(dashboard),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to load dashboard", &err)),
    }
}

async fn dashboard_grants(state: &AppState, dashboard: &Dashboard) -> Result<Vec<ShareGrant>, ApiError> {
    let shares = state
        .store
        .list_shares(&dashboard.id)
        .await
        .map_err(|err| api_internal("failed to load dashboard shares", &err))?;
    Ok(shares.iter().map(|share| share.grant()).collect())
}

/// Effective access of `viewer` on one dashboard, evaluated fresh.
pub(crate) async fn evaluate(
    state: &AppState,
    dashboard: &Dashboard,
    viewer: Option<&UserId>,
) -> Result<AccessDecision, ApiError> {
    let roster = load_roster(state).await?;
    let grants = dashboard_grants(state, dashboard).await?;
    Ok(SharingEngine::new(&roster, &grants).visible_to(&dashboard.acl(), viewer))
}

fn dedup_group_ids(ids: Vec<GroupId>) -> Vec<GroupId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Charts must point at an existing connection and at a data source that
/// belongs to that same connection. Checked only when charts are written.
async fn validate_charts(
    state: &AppState,
    issues: &mut Issues,
    charts: &[ChartConfig],
) -> Result<(), ApiError> {
    for (index, chart) in charts.iter().enumerate() {
        issues.non_empty(&format!("charts[{index}].type"), &chart.chart_type);
        match state.store.get_connection(&chart.connection_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                issues.push(
                    format!("charts[{index}].connectionId"),
                    "connection does not exist",
                );
                continue;
            }
            Err(err) => return Err(api_internal("failed to load chart connection", &err)),
        }
        match state.store.get_data_source(&chart.table_id).await {
            Ok(data_source) => issues.check(
                data_source.connection_id == chart.connection_id,
                format!("charts[{index}].tableId"),
                "data source belongs to a different connection",
            ),
            Err(StoreError::NotFound(_)) => {
                issues.push(format!("charts[{index}].tableId"), "data source does not exist")
            }
            Err(err) => return Err(api_internal("failed to load chart data source", &err)),
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/dashboards",
    tag = "dashboards",
    responses(
        (status = 200, description = "Dashboards visible to the caller; anonymous callers see public ones", body = DashboardListResponse)
    )
)]
pub(crate) async fn list_dashboards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardListResponse>, ApiError> {
    let viewer = gate::identify(&state, &headers).await?;
    let viewer_id = viewer.as_ref().map(|identity| identity.user_id);
    let dashboards = state
        .store
        .list_dashboards()
        .await
        .map_err(|err| api_internal("failed to list dashboards", &err))?;
    let roster = load_roster(&state).await?;
    let grants: Vec<ShareGrant> = match &viewer_id {
        Some(user_id) => state
            .store
            .list_shares_for_user(user_id)
            .await
            .map_err(|err| api_internal("failed to load shares", &err))?
            .iter()
            .map(|share| share.grant())
            .collect(),
        None => Vec::new(),
    };
    let engine = SharingEngine::new(&roster, &grants);
    let items: Vec<DashboardView> = dashboards
        .into_iter()
        .filter_map(|dashboard| {
            let decision = engine.visible_to(&dashboard.acl(), viewer_id.as_ref());
            decision.visible.then(|| DashboardView {
                dashboard,
                access_level: decision.access_level,
            })
        })
        .collect();
    Ok(Json(items.into()))
}

#[utoipa::path(
    post,
    path = "/v1/dashboards",
    tag = "dashboards",
    request_body = DashboardCreateRequest,
    responses(
        (status = 201, description = "Dashboard created", body = DashboardView),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks dashboard_creator", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DashboardView>), ApiError> {
    let identity = gate::require(&state, &headers, Operation::CreateDashboard).await?;
    let request: DashboardCreateRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    issues.non_empty("title", &request.title);
    validate_charts(&state, &mut issues, &request.charts).await?;
    issues.finish()?;

    let now = Utc::now();
    let dashboard = Dashboard {
        id: DashboardId::new(),
        title: request.title.trim().to_string(),
        description: request.description,
        charts: request.charts,
        group_ids: dedup_group_ids(request.group_ids),
        visibility: Visibility::normalize(request.is_public, request.access),
        default_date_range: request.default_date_range,
        show_date_range_picker: request.show_date_range_picker,
        layout: request.layout,
        created_by: identity.user_id,
        created_at: now,
        updated_at: now,
    };
    let created = state
        .store
        .create_dashboard(dashboard)
        .await
        .map_err(|err| api_internal("failed to create dashboard", &err))?;
    tracing::info!(
        dashboard_id = %created.id,
        creator = %created.created_by,
        public = created.visibility.is_public(),
        "created dashboard"
    );
    Ok((
        StatusCode::CREATED,
        Json(DashboardView {
            dashboard: created,
            access_level: AccessLevel::Edit,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/dashboards/{dashboard_id}",
    tag = "dashboards",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    responses(
        (status = 200, description = "Dashboard with the caller's access level", body = DashboardView),
        (status = 404, description = "Missing or not visible to the caller", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardView>, ApiError> {
    let viewer = gate::identify(&state, &headers).await?;
    let dashboard = load_dashboard(&state, &dashboard_id).await?;
    let decision = evaluate(&state, &dashboard, viewer.as_ref().map(|v| &v.user_id)).await?;
    if !decision.visible {
        return Err(api_not_found());
    }
    Ok(Json(DashboardView {
        dashboard,
        access_level: decision.access_level,
    }))
}

#[utoipa::path(
    patch,
    path = "/v1/dashboards/{dashboard_id}",
    tag = "dashboards",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    request_body = DashboardPatchRequest,
    responses(
        (status = 200, description = "Updated dashboard", body = DashboardView),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Visible but not editable", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Missing or not visible to the caller", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DashboardView>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let patch: DashboardPatchRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    if let Some(title) = &patch.title {
        issues.non_empty("title", title);
    }
    let mut dashboard = load_dashboard(&state, &dashboard_id).await?;
    let decision = evaluate(&state, &dashboard, Some(&identity.user_id)).await?;
    if !decision.visible {
        return Err(api_not_found());
    }
    if !decision.access_level.can_edit() {
        return Err(api_forbidden("Edit access to this dashboard is required"));
    }
    if let Some(charts) = &patch.charts {
        validate_charts(&state, &mut issues, charts).await?;
    }
    issues.finish()?;

    if let Some(title) = patch.title {
        dashboard.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        dashboard.description = Some(description).filter(|value| !value.trim().is_empty());
    }
    if let Some(charts) = patch.charts {
        dashboard.charts = charts;
    }
    if let Some(group_ids) = patch.group_ids {
        dashboard.group_ids = dedup_group_ids(group_ids);
    }
    if patch.is_public.is_some() || patch.access.is_some() {
        dashboard.visibility = Visibility::normalize(patch.is_public, patch.access);
    }
    if let Some(range) = patch.default_date_range {
        dashboard.default_date_range = Some(range);
    }
    if let Some(show) = patch.show_date_range_picker {
        dashboard.show_date_range_picker = Some(show);
    }
    if let Some(layout) = patch.layout {
        dashboard.layout = Some(layout);
    }
    dashboard.updated_at = Utc::now();
    match state.store.update_dashboard(dashboard).await {
        Ok(updated) => {
            tracing::info!(dashboard_id = %updated.id, actor = %identity.user_id, "updated dashboard");
            Ok(Json(DashboardView {
                dashboard: updated,
                access_level: decision.access_level,
            }))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to update dashboard", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/dashboards/{dashboard_id}",
    tag = "dashboards",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    responses(
        (status = 204, description = "Dashboard and its shares deleted"),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Visible but caller is neither creator nor an edit grantee", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Missing or not visible to the caller", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::Authenticated).await?;
    let dashboard = load_dashboard(&state, &dashboard_id).await?;
    let roster = load_roster(&state).await?;
    let grants = dashboard_grants(&state, &dashboard).await?;
    let engine = SharingEngine::new(&roster, &grants);
    if !engine.can_delete(&dashboard.acl(), &identity.user_id) {
        let decision = engine.visible_to(&dashboard.acl(), Some(&identity.user_id));
        if !decision.visible {
            return Err(api_not_found());
        }
        return Err(api_forbidden(
            "Only the creator or an explicit edit grantee can delete this dashboard",
        ));
    }
    match state.store.delete_dashboard(&dashboard.id).await {
        Ok(()) => {
            tracing::info!(dashboard_id = %dashboard.id, actor = %identity.user_id, "deleted dashboard");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to delete dashboard", &err)),
    }
}
