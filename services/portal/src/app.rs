//! Portal HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::identity::IdentityProvider;
use crate::auth::session::SessionIssuer;
use crate::cache::ContextCache;
use crate::introspect::DatabaseIntrospector;
use crate::observability;
use crate::store::PortalStore;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub store: Arc<dyn PortalStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionIssuer>,
    pub introspector: Arc<dyn DatabaseIntrospector>,
    /// Schema and table listings keyed by connection fingerprint.
    pub catalog_cache: Arc<ContextCache<Vec<String>>>,
    /// Where the public dashboard route sends callers for non-public boards.
    pub login_path: String,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/v1/system/info", get(api::system::system_info))
        .route("/v1/system/health", get(api::system::system_health))
        .route("/v1/auth/register", post(api::auth::register))
        .route("/v1/auth/login", post(api::auth::login))
        .route(
            "/v1/me",
            get(api::me::get_profile).patch(api::me::patch_profile),
        )
        .route("/v1/me/password", post(api::me::change_password))
        .route("/v1/users", get(api::users::list_users))
        .route("/v1/admin/users", get(api::admin::list_users))
        .route(
            "/v1/admin/users/:user_id/roles",
            put(api::admin::update_roles),
        )
        .route(
            "/v1/database-connections",
            get(api::connections::list_connections).post(api::connections::create_connection),
        )
        .route(
            "/v1/database-connections/test",
            post(api::connections::test_connection),
        )
        .route(
            "/v1/database-connections/:connection_id",
            get(api::connections::get_connection)
                .patch(api::connections::patch_connection)
                .delete(api::connections::delete_connection),
        )
        .route(
            "/v1/database-connections/:connection_id/schemas",
            get(api::connections::list_schemas),
        )
        .route(
            "/v1/database-connections/:connection_id/tables",
            get(api::connections::list_tables),
        )
        .route(
            "/v1/data-sources",
            get(api::data_sources::list_data_sources)
                .post(api::data_sources::create_data_source),
        )
        .route(
            "/v1/data-sources/:data_source_id",
            get(api::data_sources::get_data_source)
                .patch(api::data_sources::patch_data_source)
                .delete(api::data_sources::delete_data_source),
        )
        .route(
            "/v1/dashboards",
            get(api::dashboards::list_dashboards).post(api::dashboards::create_dashboard),
        )
        .route(
            "/v1/dashboards/:dashboard_id",
            get(api::dashboards::get_dashboard)
                .patch(api::dashboards::patch_dashboard)
                .delete(api::dashboards::delete_dashboard),
        )
        .route(
            "/v1/dashboards/:dashboard_id/shares",
            get(api::shares::list_shares).post(api::shares::share_dashboard),
        )
        .route(
            "/v1/dashboards/:dashboard_id/shares/:user_id",
            axum::routing::delete(api::shares::revoke_share),
        )
        .route(
            "/v1/public/dashboards/:dashboard_id",
            get(api::public::public_dashboard),
        )
        .route(
            "/v1/groups",
            get(api::groups::list_groups).post(api::groups::create_group),
        )
        .route(
            "/v1/groups/:group_id",
            get(api::groups::get_group)
                .patch(api::groups::patch_group)
                .delete(api::groups::delete_group),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
