//! OpenAPI schema aggregation for the portal API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! at `/v1/openapi.json` and rendered under `/docs`.
use crate::api::{
    admin, auth, connections, dashboards, data_sources, groups, me, public, shares, system,
    types::{
        ConnectionCreateRequest, ConnectionListResponse, ConnectionPatchRequest,
        ConnectionTestRequest, ConnectionTestResponse, DashboardCreateRequest,
        DashboardListResponse, DashboardPatchRequest, DashboardView, DataSourceCreateRequest,
        DataSourceListResponse, DataSourcePatchRequest, ErrorResponse, FieldIssue,
        GroupCreateRequest, GroupListResponse, GroupPatchRequest, HealthStatus, LoginRequest,
        LoginResponse, NameListResponse, PasswordChangeRequest, ProfilePatchRequest,
        RegisterRequest, RolesUpdateRequest, ShareListResponse, ShareRequest, SystemInfo,
        UserListResponse,
    },
    users,
};
use crate::model::{
    ChartConfig, ChartPosition, ColumnMetadata, Dashboard, DashboardShare, DataSource,
    DatabaseConnection, DatabaseType, Group, User,
};
use tessera_authz::{AccessLevel, GrantLevel, LegacyAccess, Role};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tessera-portal",
        version = "v1",
        description = "Tessera dashboard portal HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        auth::register,
        auth::login,
        me::get_profile,
        me::patch_profile,
        me::change_password,
        users::list_users,
        admin::list_users,
        admin::update_roles,
        connections::list_connections,
        connections::create_connection,
        connections::test_connection,
        connections::get_connection,
        connections::patch_connection,
        connections::delete_connection,
        connections::list_schemas,
        connections::list_tables,
        data_sources::list_data_sources,
        data_sources::create_data_source,
        data_sources::get_data_source,
        data_sources::patch_data_source,
        data_sources::delete_data_source,
        dashboards::list_dashboards,
        dashboards::create_dashboard,
        dashboards::get_dashboard,
        dashboards::patch_dashboard,
        dashboards::delete_dashboard,
        shares::list_shares,
        shares::share_dashboard,
        shares::revoke_share,
        public::public_dashboard,
        groups::list_groups,
        groups::create_group,
        groups::get_group,
        groups::patch_group,
        groups::delete_group
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        FieldIssue,
        Role,
        AccessLevel,
        GrantLevel,
        LegacyAccess,
        User,
        UserListResponse,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        ProfilePatchRequest,
        PasswordChangeRequest,
        RolesUpdateRequest,
        DatabaseType,
        DatabaseConnection,
        ConnectionListResponse,
        ConnectionCreateRequest,
        ConnectionPatchRequest,
        ConnectionTestRequest,
        ConnectionTestResponse,
        NameListResponse,
        ColumnMetadata,
        DataSource,
        DataSourceListResponse,
        DataSourceCreateRequest,
        DataSourcePatchRequest,
        ChartPosition,
        ChartConfig,
        Dashboard,
        DashboardView,
        DashboardListResponse,
        DashboardCreateRequest,
        DashboardPatchRequest,
        DashboardShare,
        ShareRequest,
        ShareListResponse,
        Group,
        GroupListResponse,
        GroupCreateRequest,
        GroupPatchRequest
    )),
    tags(
        (name = "system", description = "Health and service metadata"),
        (name = "auth", description = "Registration and sign-in"),
        (name = "me", description = "The caller's own profile"),
        (name = "users", description = "User roster"),
        (name = "admin", description = "Role administration"),
        (name = "connections", description = "Database connections and catalog browsing"),
        (name = "data-sources", description = "Table metadata"),
        (name = "dashboards", description = "Dashboards and the public view"),
        (name = "shares", description = "Per-user dashboard grants"),
        (name = "groups", description = "Owner-private user groups")
    )
)]
pub struct ApiDoc;
