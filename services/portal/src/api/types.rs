//! HTTP API request/response types.
//!
//! # Purpose
//! Payload shapes for the portal REST API and OpenAPI schema generation.
//! Wire names are camelCase throughout.
use crate::model::{
    ChartConfig, ColumnMetadata, Dashboard, DashboardShare, DataSource, DatabaseConnection,
    DatabaseType, Group, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_authz::{AccessLevel, ConnectionId, GrantLevel, GroupId, LegacyAccess, Role, UserId};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldIssue>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

// ---- auth / profile ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatchRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub organization: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RolesUpdateRequest {
    /// Duplicates are accepted and collapsed.
    pub roles: Vec<Role>,
}

// ---- connections ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DatabaseType,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatchRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

/// Either probe a stored connection by id or an unsaved descriptor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestRequest {
    pub connection_id: Option<ConnectionId>,
    #[serde(rename = "type")]
    pub kind: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionTestResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct TablesQuery {
    pub schema: Option<String>,
}

// ---- data sources ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCreateRequest {
    pub connection_id: ConnectionId,
    pub table_name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSourcePatchRequest {
    pub connection_id: Option<ConnectionId>,
    pub table_name: Option<String>,
    pub schema_name: Option<String>,
    pub description: Option<String>,
    pub columns: Option<Vec<ColumnMetadata>>,
}

// ---- dashboards ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCreateRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub group_ids: Vec<GroupId>,
    #[serde(default)]
    pub is_public: Option<bool>,
    /// Older clients send `access` instead of `isPublic`.
    #[serde(default)]
    pub access: Option<LegacyAccess>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub default_date_range: Option<Value>,
    #[serde(default)]
    pub show_date_range_picker: Option<bool>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub layout: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub charts: Option<Vec<ChartConfig>>,
    pub group_ids: Option<Vec<GroupId>>,
    pub is_public: Option<bool>,
    pub access: Option<LegacyAccess>,
    #[schema(value_type = Option<Object>)]
    pub default_date_range: Option<Value>,
    pub show_date_range_picker: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub layout: Option<Value>,
}

/// A dashboard together with the caller's effective access to it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub user_id: UserId,
    pub access_level: GrantLevel,
}

// ---- groups ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub role: GrantLevel,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub role: Option<GrantLevel>,
    pub member_ids: Option<Vec<UserId>>,
}

macro_rules! list_response {
    ($($name:ident => $item:ty),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Serialize, ToSchema)]
            pub struct $name {
                pub items: Vec<$item>,
            }

            impl From<Vec<$item>> for $name {
                fn from(items: Vec<$item>) -> Self {
                    Self { items }
                }
            }
        )+
    };
}

list_response! {
    ConnectionListResponse => DatabaseConnection,
    DataSourceListResponse => DataSource,
    DashboardListResponse => DashboardView,
    ShareListResponse => DashboardShare,
    GroupListResponse => Group,
    UserListResponse => User,
    NameListResponse => String,
}
