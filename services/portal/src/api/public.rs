//! Read-only public dashboard view.
//!
//! Only public dashboards render here. Anything else, including ids that do
//! not exist, redirects to the login page rather than revealing which case
//! applied.
use crate::api::dashboards::load_dashboard;
use crate::api::error::ApiError;
use crate::api::types::DashboardView;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use tessera_authz::AccessLevel;

#[utoipa::path(
    get,
    path = "/v1/public/dashboards/{dashboard_id}",
    tag = "dashboards",
    params(("dashboard_id" = String, Path, description = "Dashboard identifier")),
    responses(
        (status = 200, description = "Public dashboard, view only", body = DashboardView),
        (status = 303, description = "Not public; redirect to the login page")
    )
)]
pub(crate) async fn public_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let dashboard = match load_dashboard(&state, &dashboard_id).await {
        Ok(dashboard) => dashboard,
        Err(err) if err.status == StatusCode::NOT_FOUND => {
            return Ok(Redirect::to(&state.login_path).into_response());
        }
        Err(err) => return Err(err),
    };
    if !dashboard.visibility.is_public() {
        tracing::debug!(dashboard_id = %dashboard.id, "public view of restricted dashboard");
        return Ok(Redirect::to(&state.login_path).into_response());
    }
    Ok(Json(DashboardView {
        dashboard,
        access_level: AccessLevel::View,
    })
    .into_response())
}
