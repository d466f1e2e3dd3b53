//! Database connection handlers.
//!
//! Any `db_admin` manages every connection, whoever created it. Passwords
//! are accepted on create and update and stripped from every response.
//! Catalog listings (schemas, tables) are served through the context cache
//! and invalidated whenever the connection changes or goes away.
use crate::api::error::{ApiError, api_forbidden_bare, api_internal, api_internal_message, api_not_found};
use crate::api::parse_id;
use crate::api::types::{
    ConnectionCreateRequest, ConnectionListResponse, ConnectionPatchRequest, ConnectionTestRequest,
    ConnectionTestResponse, NameListResponse, TablesQuery,
};
use crate::api::validation::{Issues, parse_json};
use crate::app::AppState;
use crate::auth::gate;
use crate::introspect::{ConnectionDescriptor, IntrospectError};
use crate::model::{ConnectionRecord, DatabaseConnection};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use tessera_authz::{ConnectionId, Identity, Operation, OwnedResource, can_mutate, can_read};

fn validate_descriptor_fields(
    issues: &mut Issues,
    host: &str,
    port: u16,
    database: &str,
    username: &str,
) {
    issues.non_empty("host", host);
    issues.check(port > 0, "port", "must be between 1 and 65535");
    issues.non_empty("database", database);
    issues.non_empty("username", username);
}

async fn load_connection(state: &AppState, raw_id: &str) -> Result<ConnectionRecord, ApiError> {
    let id: ConnectionId = parse_id(raw_id)?;
    fetch_connection(state, &id).await
}

async fn fetch_connection(state: &AppState, id: &ConnectionId) -> Result<ConnectionRecord, ApiError> {
    match state.store.get_connection(id).await {
        Ok(connection) => Ok(connection),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to load connection", &err)),
    }
}

fn ensure_mutable(identity: &Identity) -> Result<(), ApiError> {
    if can_mutate(OwnedResource::Connection, identity) {
        Ok(())
    } else {
        Err(api_forbidden_bare())
    }
}

async fn forget_catalog(state: &AppState, connection: &ConnectionRecord) {
    let prefix = format!("{}/", ConnectionDescriptor::from(connection).fingerprint());
    let dropped = state.catalog_cache.invalidate_prefix(&prefix).await;
    if dropped > 0 {
        tracing::debug!(connection_id = %connection.id, dropped, "dropped cached catalog");
    }
}

fn driver_failure(connection_id: ConnectionId, err: IntrospectError) -> ApiError {
    tracing::error!(%connection_id, error = %err, "database driver failed");
    api_internal_message("database driver failed")
}

#[utoipa::path(
    get,
    path = "/v1/database-connections",
    tag = "connections",
    responses(
        (status = 200, description = "All connections, without passwords", body = ConnectionListResponse),
        (status = 401, description = "Not signed in", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks db_admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_connections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConnectionListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::ManageConnections).await?;
    let connections = state
        .store
        .list_connections()
        .await
        .map_err(|err| api_internal("failed to list connections", &err))?;
    Ok(Json(
        connections
            .iter()
            .map(ConnectionRecord::view)
            .collect::<Vec<_>>()
            .into(),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/database-connections",
    tag = "connections",
    request_body = ConnectionCreateRequest,
    responses(
        (status = 201, description = "Connection created", body = DatabaseConnection),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller lacks db_admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DatabaseConnection>), ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageConnections).await?;
    let request: ConnectionCreateRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    issues.non_empty("name", &request.name);
    validate_descriptor_fields(
        &mut issues,
        &request.host,
        request.port,
        &request.database,
        &request.username,
    );
    issues.finish()?;

    let now = Utc::now();
    let record = ConnectionRecord {
        id: ConnectionId::new(),
        name: request.name.trim().to_string(),
        kind: request.kind,
        host: request.host.trim().to_string(),
        port: request.port,
        database: request.database,
        username: request.username,
        password: request.password,
        active: request.active,
        created_by: identity.user_id,
        created_at: now,
        updated_at: now,
    };
    let created = state
        .store
        .create_connection(record)
        .await
        .map_err(|err| api_internal("failed to create connection", &err))?;
    tracing::info!(connection_id = %created.id, kind = created.kind.as_str(), "created connection");
    Ok((StatusCode::CREATED, Json(created.view())))
}

#[utoipa::path(
    get,
    path = "/v1/database-connections/{connection_id}",
    tag = "connections",
    params(("connection_id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 200, description = "Connection, without password", body = DatabaseConnection),
        (status = 404, description = "Connection not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_connection(
    Path(connection_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DatabaseConnection>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageConnections).await?;
    let connection = load_connection(&state, &connection_id).await?;
    if !can_read(OwnedResource::Connection, &identity) {
        return Err(api_forbidden_bare());
    }
    Ok(Json(connection.view()))
}

#[utoipa::path(
    patch,
    path = "/v1/database-connections/{connection_id}",
    tag = "connections",
    params(("connection_id" = String, Path, description = "Connection identifier")),
    request_body = ConnectionPatchRequest,
    responses(
        (status = 200, description = "Updated connection", body = DatabaseConnection),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Connection not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_connection(
    Path(connection_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DatabaseConnection>, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageConnections).await?;
    let patch: ConnectionPatchRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    if let Some(name) = &patch.name {
        issues.non_empty("name", name);
    }
    if let Some(host) = &patch.host {
        issues.non_empty("host", host);
    }
    if let Some(port) = patch.port {
        issues.check(port > 0, "port", "must be between 1 and 65535");
    }
    if let Some(database) = &patch.database {
        issues.non_empty("database", database);
    }
    if let Some(username) = &patch.username {
        issues.non_empty("username", username);
    }
    issues.finish()?;

    let mut connection = load_connection(&state, &connection_id).await?;
    ensure_mutable(&identity)?;
    forget_catalog(&state, &connection).await;

    if let Some(name) = patch.name {
        connection.name = name.trim().to_string();
    }
    if let Some(kind) = patch.kind {
        connection.kind = kind;
    }
    if let Some(host) = patch.host {
        connection.host = host.trim().to_string();
    }
    if let Some(port) = patch.port {
        connection.port = port;
    }
    if let Some(database) = patch.database {
        connection.database = database;
    }
    if let Some(username) = patch.username {
        connection.username = username;
    }
    if let Some(password) = patch.password {
        connection.password = password;
    }
    if let Some(active) = patch.active {
        connection.active = active;
    }
    connection.updated_at = Utc::now();
    match state.store.update_connection(connection).await {
        Ok(updated) => {
            tracing::info!(
                connection_id = %updated.id,
                actor = %identity.user_id,
                "updated connection"
            );
            Ok(Json(updated.view()))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to update connection", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/database-connections/{connection_id}",
    tag = "connections",
    params(("connection_id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 204, description = "Connection deleted"),
        (status = 404, description = "Connection not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_connection(
    Path(connection_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = gate::require(&state, &headers, Operation::ManageConnections).await?;
    let connection = load_connection(&state, &connection_id).await?;
    ensure_mutable(&identity)?;
    forget_catalog(&state, &connection).await;
    match state.store.delete_connection(&connection.id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound(_)) => Err(api_not_found()),
        Err(err) => Err(api_internal("failed to delete connection", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/database-connections/test",
    tag = "connections",
    request_body = ConnectionTestRequest,
    responses(
        (status = 200, description = "Probe result; driver failures report ok=false", body = ConnectionTestResponse),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Stored connection not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn test_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ConnectionTestResponse>, ApiError> {
    gate::require(&state, &headers, Operation::ManageConnections).await?;
    let request: ConnectionTestRequest = parse_json(&body)?;
    let descriptor = match request.connection_id {
        Some(id) => ConnectionDescriptor::from(&fetch_connection(&state, &id).await?),
        None => descriptor_from_request(request)?,
    };
    match state.introspector.test(&descriptor).await {
        Ok(()) => Ok(Json(ConnectionTestResponse {
            ok: true,
            message: None,
        })),
        Err(err) => {
            tracing::warn!(host = %descriptor.host, error = %err, "connection test failed");
            Ok(Json(ConnectionTestResponse {
                ok: false,
                message: Some(err.to_string()),
            }))
        }
    }
}

fn descriptor_from_request(request: ConnectionTestRequest) -> Result<ConnectionDescriptor, ApiError> {
    let mut issues = Issues::new();
    issues.check(request.kind.is_some(), "type", "is required");
    issues.check(request.port.is_some(), "port", "is required");
    validate_descriptor_fields(
        &mut issues,
        request.host.as_deref().unwrap_or_default(),
        request.port.unwrap_or(1),
        request.database.as_deref().unwrap_or_default(),
        request.username.as_deref().unwrap_or_default(),
    );
    issues.finish()?;
    match (request.kind, request.host, request.port, request.database, request.username) {
        (Some(kind), Some(host), Some(port), Some(database), Some(username)) => {
            Ok(ConnectionDescriptor {
                kind,
                host,
                port,
                database,
                username,
                password: request.password.unwrap_or_default(),
            })
        }
        // Every missing field was reported above.
        _ => Err(api_internal_message("incomplete connection descriptor")),
    }
}

#[utoipa::path(
    get,
    path = "/v1/database-connections/{connection_id}/schemas",
    tag = "connections",
    params(("connection_id" = String, Path, description = "Connection identifier")),
    responses(
        (status = 200, description = "Schema names", body = NameListResponse),
        (status = 404, description = "Connection not found", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Driver failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_schemas(
    Path(connection_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NameListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::ManageConnections).await?;
    let connection = load_connection(&state, &connection_id).await?;
    let descriptor = ConnectionDescriptor::from(&connection);
    let key = format!("{}/schemas", descriptor.fingerprint());
    if let Some(names) = state.catalog_cache.get(&key).await {
        return Ok(Json(names.into()));
    }
    let names = state
        .introspector
        .list_schemas(&descriptor)
        .await
        .map_err(|err| driver_failure(connection.id, err))?;
    state.catalog_cache.put(key, names.clone()).await;
    Ok(Json(names.into()))
}

#[utoipa::path(
    get,
    path = "/v1/database-connections/{connection_id}/tables",
    tag = "connections",
    params(
        ("connection_id" = String, Path, description = "Connection identifier"),
        TablesQuery
    ),
    responses(
        (status = 200, description = "Table names in the schema", body = NameListResponse),
        (status = 404, description = "Connection not found", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Driver failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_tables(
    Path(connection_id): Path<String>,
    Query(query): Query<TablesQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NameListResponse>, ApiError> {
    gate::require(&state, &headers, Operation::ManageConnections).await?;
    let connection = load_connection(&state, &connection_id).await?;
    let descriptor = ConnectionDescriptor::from(&connection);
    let schema = query.schema.filter(|schema| !schema.trim().is_empty());
    let key = format!(
        "{}/tables/{}",
        descriptor.fingerprint(),
        schema.as_deref().unwrap_or_default()
    );
    if let Some(names) = state.catalog_cache.get(&key).await {
        return Ok(Json(names.into()));
    }
    let names = state
        .introspector
        .list_tables(&descriptor, schema.as_deref())
        .await
        .map_err(|err| driver_failure(connection.id, err))?;
    state.catalog_cache.put(key, names.clone()).await;
    Ok(Json(names.into()))
}
