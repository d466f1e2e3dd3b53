//! User roster for pickers (sharing, group membership).
use crate::api::error::{ApiError, api_internal};
use crate::api::types::UserListResponse;
use crate::app::AppState;
use crate::auth::gate;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use tessera_authz::Operation;

#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Every user, without credentials", body = UserListResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::Authenticated).await?;
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list users", &err))?;
    Ok(Json(
        users.iter().map(|user| user.view()).collect::<Vec<_>>().into(),
    ))
}
