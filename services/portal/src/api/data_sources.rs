//! Data source metadata handlers. Collection-wide for any `metadata_editor`.
use crate::api::error::{
    ApiError, api_forbidden_bare, api_internal, api_invalid_field, api_not_found,
};
use crate::api::parse_id;
use crate::api::types::{DataSourceCreateRequest, DataSourceListResponse, DataSourcePatchRequest};
use crate::api::validation::{Issues, parse_json};
use crate::app::AppState;
use crate::auth::gate;
use crate::model::{ColumnMetadata, DataSource};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use std::collections::HashSet;
use tessera_authz::{ConnectionId, DataSourceId, Identity, Operation, OwnedResource, can_mutate, can_read};

fn validate_columns(issues: &mut Issues, columns: &[ColumnMetadata]) {
    let mut seen = HashSet::new();
    for (index, column) in columns.iter().enumerate() {
        let name = column.column_name.trim();
        if name.is_empty() {
            issues.push(format!("columns[{index}].columnName"), "must not be empty");
        } else if !seen.insert(name.to_string()) {
            issues.push(
                format!("columns[{index}].columnName"),
                format!("duplicate column `{name}`"),
            );
        }
        issues.check(
            !column.data_type.trim().is_empty(),
            format!("columns[{index}].dataType"),
            "must not be empty",
        );
    }
}

/// Unknown connections are an input problem, not a missing path resource.
async fn ensure_connection_exists(state: &AppState, id: &ConnectionId) -> Result<(), ApiError> {
    match state.store.get_connection(id).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(api_invalid_field(
            "connectionId",
            "connection does not exist",
        )),
        Err(err) => Err(api_internal("failed to load connection", &err)),
    }
}

async fn load_data_source(state: &AppState, raw_id: &str) -> Result<DataSource, ApiError> {
    let id: DataSourceId = parse_id(raw_id)?;
    match state.store.get_data_source(&id).await {
        Ok(data_source) => Ok(data_source),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to load data source", &err)),
    }
}

fn ensure_mutable(identity: &Identity) -> Result<(), ApiError> {
    if can_mutate(OwnedResource::DataSource, identity) {
        Ok(())
    } else {
        Err(api_forbidden_bare())
    }
}

#[utoipa::path(
    get,
    path = "/v1/data-sources",
    tag = "data-sources",
    responses(
        (status = 200, description = "All data sources", body = DataSourceListResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks metadata_editor", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_data_sources(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataSourceListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::ManageDataSources).await?;
    let data_sources = state
        .store
        .list_data_sources()
        .await
        .map_err(|err| api_internal("failed to list data sources", &err))?;
    Ok(Json(data_sources.into()))
}

#[utoipa::path(
    post,
    path = "/v1/data-sources",
    tag = "data-sources",
    request_body = DataSourceCreateRequest,
    responses(
        (status = 201, description = "Data source created", body = DataSource),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks metadata_editor", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_data_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DataSource>), ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageDataSources).await?;
    let request: DataSourceCreateRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    issues.non_empty("tableName", &request.table_name);
    validate_columns(&mut issues, &request.columns);
    issues.finish()?;
    ensure_connection_exists(&state, &request.connection_id).await?;

    let now = Utc::now();
    let data_source = DataSource {
        id: DataSourceId::new(),
        connection_id: request.connection_id,
        table_name: request.table_name.trim().to_string(),
        schema_name: request.schema_name,
        description: request.description,
        columns: request.columns,
        created_by: identity.user_id,
        created_at: now,
        updated_at: now,
    };
    let created = state
        .store
        .create_data_source(data_source)
        .await
        .map_err(|err| api_internal("failed to create data source", &err))?;
    tracing::info!(
        data_source_id = %created.id,
        connection_id = %created.connection_id,
        table = %created.table_name,
        "created data source"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/v1/data-sources/{data_source_id}",
    tag = "data-sources",
    params(("data_source_id" = String, Path, description = "Data source identifier")),
    responses(
        (status = 200, description = "Data source", body = DataSource),
        (status = 404, description = "Data source not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_data_source(
    Path(data_source_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataSource>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageDataSources).await?;
    let data_source = load_data_source(&state, &data_source_id).await?;
    if !can_read(OwnedResource::DataSource, &identity) {
        return Err(api_forbidden_bare());
    }
    Ok(Json(data_source))
}

#[utoipa::path(
    patch,
    path = "/v1/data-sources/{data_source_id}",
    tag = "data-sources",
    params(("data_source_id" = String, Path, description = "Data source identifier")),
    request_body = DataSourcePatchRequest,
    responses(
        (status = 200, description = "Updated data source", body = DataSource),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Data source not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_data_source(
    Path(data_source_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DataSource>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageDataSources).await?;
    let patch: DataSourcePatchRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    if let Some(table_name) = &patch.table_name {
        issues.non_empty("tableName", table_name);
    }
    if let Some(columns) = &patch.columns {
        validate_columns(&mut issues, columns);
    }
    issues.finish()?;

    let mut data_source = load_data_source(&state, &data_source_id).await?;
    ensure_mutable(&identity)?;
    if let Some(connection_id) = patch.connection_id {
        ensure_connection_exists(&state, &connection_id).await?;
        data_source.connection_id = connection_id;
    }
    if let Some(table_name) = patch.table_name {
        data_source.table_name = table_name.trim().to_string();
    }
    if let Some(schema_name) = patch.schema_name {
        data_source.schema_name = Some(schema_name).filter(|value| !value.trim().is_empty());
    }
    if let Some(description) = patch.description {
        data_source.description = Some(description).filter(|value| !value.trim().is_empty());
    }
    if let Some(columns) = patch.columns {
        data_source.columns = columns;
    }
    data_source.updated_at = Utc::now();
    match state.store.update_data_source(data_source).await {
        Ok(updated) => Ok(Json(updated)),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to update data source", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/data-sources/{data_source_id}",
    tag = "data-sources",
    params(("data_source_id" = String, Path, description = "Data source identifier")),
    responses(
        (status = 204, description = "Data source deleted"),
        (status = 404, description = "Data source not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_data_source(
    Path(data_source_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageDataSources).await?;
    let id: DataSourceId = parse_id(&data_source_id)?;
    ensure_mutable(&identity)?;
    match state.store.delete_data_source(&id).await {
        Ok(()) => {
            tracing::info!(data_source_id = %id, actor = %identity.user_id, "deleted data source");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to delete data source", &err)),
    }
}
