//! Portal storage layer.
//!
//! # Purpose
//! A keyed document store per collection (users, connections, data sources,
//! dashboards, dashboard shares, groups) behind one async trait, so handlers
//! do not care whether state lives in memory or in Postgres.
//!
//! # Key invariants
//! - User emails are unique case-insensitively (`Conflict` otherwise).
//! - One dashboard share per `(dashboard, user)`; re-sharing replaces the level.
//! - Deleting a dashboard removes its shares.
//! - Updates replace the whole document; concurrent writers are last-write-wins.
use crate::model::{
    ConnectionRecord, Dashboard, DashboardShare, DataSource, Group, UserRecord,
};
use async_trait::async_trait;
use tessera_authz::{ConnectionId, DashboardId, DataSourceId, GroupId, UserId};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

/// Result of a share upsert: the stored grant and whether it was new.
#[derive(Debug, Clone)]
pub struct ShareUpsert {
    pub share: DashboardShare,
    pub created: bool,
}

#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>>;
    async fn get_user(&self, id: &UserId) -> StoreResult<UserRecord>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn create_user(&self, user: UserRecord) -> StoreResult<UserRecord>;
    async fn update_user(&self, user: UserRecord) -> StoreResult<UserRecord>;

    async fn list_connections(&self) -> StoreResult<Vec<ConnectionRecord>>;
    async fn get_connection(&self, id: &ConnectionId) -> StoreResult<ConnectionRecord>;
    async fn create_connection(&self, connection: ConnectionRecord)
    -> StoreResult<ConnectionRecord>;
    async fn update_connection(&self, connection: ConnectionRecord)
    -> StoreResult<ConnectionRecord>;
    async fn delete_connection(&self, id: &ConnectionId) -> StoreResult<()>;

    async fn list_data_sources(&self) -> StoreResult<Vec<DataSource>>;
    async fn get_data_source(&self, id: &DataSourceId) -> StoreResult<DataSource>;
    async fn create_data_source(&self, data_source: DataSource) -> StoreResult<DataSource>;
    async fn update_data_source(&self, data_source: DataSource) -> StoreResult<DataSource>;
    async fn delete_data_source(&self, id: &DataSourceId) -> StoreResult<()>;

    async fn list_dashboards(&self) -> StoreResult<Vec<Dashboard>>;
    async fn get_dashboard(&self, id: &DashboardId) -> StoreResult<Dashboard>;
    async fn create_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard>;
    async fn update_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard>;
    async fn delete_dashboard(&self, id: &DashboardId) -> StoreResult<()>;

    async fn list_shares(&self, dashboard_id: &DashboardId) -> StoreResult<Vec<DashboardShare>>;
    async fn list_shares_for_user(&self, user_id: &UserId) -> StoreResult<Vec<DashboardShare>>;
    async fn upsert_share(&self, share: DashboardShare) -> StoreResult<ShareUpsert>;
    async fn delete_share(&self, dashboard_id: &DashboardId, user_id: &UserId)
    -> StoreResult<()>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;
    async fn get_group(&self, id: &GroupId) -> StoreResult<Group>;
    async fn create_group(&self, group: Group) -> StoreResult<Group>;
    async fn update_group(&self, group: Group) -> StoreResult<Group>;
    async fn delete_group(&self, id: &GroupId) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
