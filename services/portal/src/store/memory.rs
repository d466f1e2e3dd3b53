//! In-memory implementation of the portal store.
//!
//! # Purpose
//! Implements [`PortalStore`] with `HashMap`s guarded by `tokio::sync::RwLock`.
//! Used for local development, tests, and deployments that do not need
//! durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Each collection has its own lock; there are no cross-collection
//!   transactions. Deleting a dashboard takes the dashboard lock and then the
//!   share lock, always in that order.
//! - Listings are returned in creation order so responses are stable.
//!
//! # Metrics
//! Collection gauges and the share counter mirror the Postgres backend.
use super::{PortalStore, ShareUpsert, StoreError, StoreResult};
use crate::model::normalize_email;
use crate::model::{ConnectionRecord, Dashboard, DashboardShare, DataSource, Group, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tessera_authz::{ConnectionId, DashboardId, DataSourceId, GroupId, UserId};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionRecord>>>,
    data_sources: Arc<RwLock<HashMap<DataSourceId, DataSource>>>,
    dashboards: Arc<RwLock<HashMap<DashboardId, Dashboard>>>,
    /// Keyed by `(dashboard, grantee)`, which is what makes re-sharing an upsert.
    shares: Arc<RwLock<HashMap<(DashboardId, UserId), DashboardShare>>>,
    groups: Arc<RwLock<HashMap<GroupId, Group>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_creation_order<K, V: Clone>(
    map: &HashMap<K, V>,
    created_at: impl Fn(&V) -> DateTime<Utc>,
) -> Vec<V> {
    let mut items: Vec<V> = map.values().cloned().collect();
    items.sort_by_key(|item| created_at(item));
    items
}

fn fetch<K: Eq + Hash, V: Clone>(map: &HashMap<K, V>, key: &K, label: &str) -> StoreResult<V> {
    map.get(key)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(label.to_string()))
}

fn replace<K: Eq + Hash, V: Clone>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    label: &str,
) -> StoreResult<V> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value.clone();
            Ok(value)
        }
        None => Err(StoreError::NotFound(label.to_string())),
    }
}

#[async_trait]
impl PortalStore for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        Ok(in_creation_order(&users, |user| user.created_at))
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<UserRecord> {
        fetch(&*self.users.read().await, id, "user")
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let wanted = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| normalize_email(&user.email) == wanted)
            .cloned())
    }

    async fn create_user(&self, user: UserRecord) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users
            .values()
            .any(|existing| normalize_email(&existing.email) == email)
        {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        users.insert(user.id, user.clone());
        metrics::gauge!("tessera_users_total").set(users.len() as f64);
        Ok(user)
    }

    async fn update_user(&self, user: UserRecord) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users
            .values()
            .any(|existing| existing.id != user.id && normalize_email(&existing.email) == email)
        {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        replace(&mut users, user.id, user, "user")
    }

    async fn list_connections(&self) -> StoreResult<Vec<ConnectionRecord>> {
        let connections = self.connections.read().await;
        Ok(in_creation_order(&connections, |conn| conn.created_at))
    }

    async fn get_connection(&self, id: &ConnectionId) -> StoreResult<ConnectionRecord> {
        fetch(&*self.connections.read().await, id, "connection")
    }

    async fn create_connection(
        &self,
        connection: ConnectionRecord,
    ) -> StoreResult<ConnectionRecord> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&connection.id) {
            return Err(StoreError::Conflict("connection exists".into()));
        }
        connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn update_connection(
        &self,
        connection: ConnectionRecord,
    ) -> StoreResult<ConnectionRecord> {
        let mut connections = self.connections.write().await;
        replace(&mut connections, connection.id, connection, "connection")
    }

    async fn delete_connection(&self, id: &ConnectionId) -> StoreResult<()> {
        match self.connections.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("connection".into())),
        }
    }

    async fn list_data_sources(&self) -> StoreResult<Vec<DataSource>> {
        let data_sources = self.data_sources.read().await;
        Ok(in_creation_order(&data_sources, |source| source.created_at))
    }

    async fn get_data_source(&self, id: &DataSourceId) -> StoreResult<DataSource> {
        fetch(&*self.data_sources.read().await, id, "data source")
    }

    async fn create_data_source(&self, data_source: DataSource) -> StoreResult<DataSource> {
        let mut data_sources = self.data_sources.write().await;
        if data_sources.contains_key(&data_source.id) {
            return Err(StoreError::Conflict("data source exists".into()));
        }
        data_sources.insert(data_source.id, data_source.clone());
        Ok(data_source)
    }

    async fn update_data_source(&self, data_source: DataSource) -> StoreResult<DataSource> {
        let mut data_sources = self.data_sources.write().await;
        replace(&mut data_sources, data_source.id, data_source, "data source")
    }

    async fn delete_data_source(&self, id: &DataSourceId) -> StoreResult<()> {
        match self.data_sources.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("data source".into())),
        }
    }

    async fn list_dashboards(&self) -> StoreResult<Vec<Dashboard>> {
        let dashboards = self.dashboards.read().await;
        Ok(in_creation_order(&dashboards, |dashboard| {
            dashboard.created_at
        }))
    }

    async fn get_dashboard(&self, id: &DashboardId) -> StoreResult<Dashboard> {
        fetch(&*self.dashboards.read().await, id, "dashboard")
    }

    async fn create_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard> {
        let mut dashboards = self.dashboards.write().await;
        if dashboards.contains_key(&dashboard.id) {
            return Err(StoreError::Conflict("dashboard exists".into()));
        }
        dashboards.insert(dashboard.id, dashboard.clone());
        metrics::gauge!("tessera_dashboards_total").set(dashboards.len() as f64);
        Ok(dashboard)
    }

    async fn update_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard> {
        let mut dashboards = self.dashboards.write().await;
        replace(&mut dashboards, dashboard.id, dashboard, "dashboard")
    }

    async fn delete_dashboard(&self, id: &DashboardId) -> StoreResult<()> {
        let mut dashboards = self.dashboards.write().await;
        if dashboards.remove(id).is_none() {
            return Err(StoreError::NotFound("dashboard".into()));
        }
        metrics::gauge!("tessera_dashboards_total").set(dashboards.len() as f64);
        drop(dashboards);
        self.shares
            .write()
            .await
            .retain(|(dashboard_id, _), _| dashboard_id != id);
        Ok(())
    }

    async fn list_shares(&self, dashboard_id: &DashboardId) -> StoreResult<Vec<DashboardShare>> {
        let shares = self.shares.read().await;
        let mut items: Vec<DashboardShare> = shares
            .values()
            .filter(|share| share.dashboard_id == *dashboard_id)
            .cloned()
            .collect();
        items.sort_by_key(|share| share.created_at);
        Ok(items)
    }

    async fn list_shares_for_user(&self, user_id: &UserId) -> StoreResult<Vec<DashboardShare>> {
        let shares = self.shares.read().await;
        let mut items: Vec<DashboardShare> = shares
            .values()
            .filter(|share| share.user_id == *user_id)
            .cloned()
            .collect();
        items.sort_by_key(|share| share.created_at);
        Ok(items)
    }

    async fn upsert_share(&self, share: DashboardShare) -> StoreResult<ShareUpsert> {
        // Dashboards before shares, the same order `delete_dashboard` locks in.
        let dashboards = self.dashboards.read().await;
        if !dashboards.contains_key(&share.dashboard_id) {
            return Err(StoreError::NotFound("dashboard".into()));
        }
        let mut shares = self.shares.write().await;
        let key = (share.dashboard_id, share.user_id);
        if let Some(existing) = shares.get_mut(&key) {
            // Keep the original grant identity; only the level moves.
            existing.access_level = share.access_level;
            metrics::counter!("tessera_dashboard_shares_total", "op" => "updated").increment(1);
            return Ok(ShareUpsert {
                share: existing.clone(),
                created: false,
            });
        }
        shares.insert(key, share.clone());
        metrics::counter!("tessera_dashboard_shares_total", "op" => "created").increment(1);
        Ok(ShareUpsert {
            share,
            created: true,
        })
    }

    async fn delete_share(&self, dashboard_id: &DashboardId, user_id: &UserId) -> StoreResult<()> {
        match self.shares.write().await.remove(&(*dashboard_id, *user_id)) {
            Some(_) => {
                metrics::counter!("tessera_dashboard_shares_total", "op" => "revoked")
                    .increment(1);
                Ok(())
            }
            None => Err(StoreError::NotFound("share".into())),
        }
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(in_creation_order(&groups, |group| group.created_at))
    }

    async fn get_group(&self, id: &GroupId) -> StoreResult<Group> {
        fetch(&*self.groups.read().await, id, "group")
    }

    async fn create_group(&self, group: Group) -> StoreResult<Group> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(&group.id) {
            return Err(StoreError::Conflict("group exists".into()));
        }
        groups.insert(group.id, group.clone());
        metrics::gauge!("tessera_groups_total").set(groups.len() as f64);
        Ok(group)
    }

    async fn update_group(&self, group: Group) -> StoreResult<Group> {
        let mut groups = self.groups.write().await;
        replace(&mut groups, group.id, group, "group")
    }

    async fn delete_group(&self, id: &GroupId) -> StoreResult<()> {
        let mut groups = self.groups.write().await;
        if groups.remove(id).is_none() {
            return Err(StoreError::NotFound("group".into()));
        }
        metrics::gauge!("tessera_groups_total").set(groups.len() as f64);
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        // Taking a read lock is enough to prove the store is responsive.
        let _guard = self.users.read().await;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
