//! Postgres-backed implementation of the portal store.
//!
//! # Data model
//! Each collection is a table holding the serialized document in a `doc`
//! JSONB column, plus the few plain columns needed for keys, uniqueness and
//! ordering (`email`, `(dashboard_id, user_id)`, `created_at`). Documents are
//! decoded through the same serde shapes the in-memory store uses, which is
//! also where legacy dashboard visibility gets normalized on read.
//!
//! # Consistency
//! - Every method is a single statement; there are no cross-table
//!   transactions. Share rows cascade with their dashboard through a foreign
//!   key.
//! - Share upserts rely on the `(dashboard_id, user_id)` unique constraint,
//!   so two concurrent grants to the same user converge on one row.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Pool connect and acquire are both bounded by timeouts.
//! - Database URLs may contain credentials; they are never logged here.
//! - Table names reach `format!` only from the fixed constants below.
use super::{PortalStore, ShareUpsert, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{
    ConnectionRecord, Dashboard, DashboardShare, DataSource, Group, UserRecord, normalize_email,
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tessera_authz::{ConnectionId, DashboardId, DataSourceId, GroupId, UserId};
use uuid::Uuid;

const USERS: &str = "users";
const CONNECTIONS: &str = "database_connections";
const DATA_SOURCES: &str = "data_sources";
const DASHBOARDS: &str = "dashboards";
const GROUPS: &str = "groups";

/// Durable portal store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use portal::config::PostgresConfig;
/// use portal::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct DocRow {
    doc: Value,
}

#[derive(Debug, FromRow)]
struct UpsertRow {
    doc: Value,
    inserted: bool,
}

impl PostgresStore {
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))??;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn list_docs<T: DeserializeOwned>(&self, table: &'static str) -> StoreResult<Vec<T>> {
        let query = format!("SELECT doc FROM {table} ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, DocRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|row| decode(row.doc)).collect()
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: Uuid,
        label: &str,
    ) -> StoreResult<T> {
        let query = format!("SELECT doc FROM {table} WHERE id = $1");
        let row = sqlx::query_as::<_, DocRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => decode(row.doc),
            None => Err(StoreError::NotFound(label.to_string())),
        }
    }

    async fn update_doc(
        &self,
        table: &'static str,
        id: Uuid,
        doc: Value,
        label: &str,
    ) -> StoreResult<()> {
        let query = format!("UPDATE {table} SET doc = $2 WHERE id = $1");
        let result = sqlx::query(&query)
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(label.to_string()));
        }
        Ok(())
    }

    async fn delete_doc(&self, table: &'static str, id: Uuid, label: &str) -> StoreResult<()> {
        let query = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(label.to_string()));
        }
        Ok(())
    }

    async fn refresh_count(&self, table: &'static str, gauge: &'static str) -> StoreResult<()> {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let total = sqlx::query_scalar::<_, i64>(&query).fetch_one(&self.pool).await?;
        metrics::gauge!(gauge).set(total as f64);
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    serde_json::to_value(value)
        .context("encode document")
        .map_err(StoreError::Unexpected)
}

fn decode<T: DeserializeOwned>(doc: Value) -> StoreResult<T> {
    serde_json::from_value(doc)
        .context("decode document")
        .map_err(StoreError::Unexpected)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23503").unwrap_or(false);
    }
    false
}

#[async_trait]
impl PortalStore for PostgresStore {
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        self.list_docs(USERS).await
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<UserRecord> {
        self.get_doc(USERS, id.as_uuid(), "user").await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, DocRow>("SELECT doc FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(row.doc)).transpose()
    }

    async fn create_user(&self, user: UserRecord) -> StoreResult<UserRecord> {
        let insert = sqlx::query(
            r#"INSERT INTO users (id, email, doc, created_at) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(user.id.as_uuid())
        .bind(normalize_email(&user.email))
        .bind(encode(&user)?)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("email already registered".into()));
            }
            return Err(err.into());
        }
        self.refresh_count(USERS, "tessera_users_total").await?;
        Ok(user)
    }

    async fn update_user(&self, user: UserRecord) -> StoreResult<UserRecord> {
        let update = sqlx::query(r#"UPDATE users SET email = $2, doc = $3 WHERE id = $1"#)
            .bind(user.id.as_uuid())
            .bind(normalize_email(&user.email))
            .bind(encode(&user)?)
            .execute(&self.pool)
            .await;
        match update {
            Ok(result) if result.rows_affected() == 0 => Err(StoreError::NotFound("user".into())),
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("email already registered".into()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_connections(&self) -> StoreResult<Vec<ConnectionRecord>> {
        self.list_docs(CONNECTIONS).await
    }

    async fn get_connection(&self, id: &ConnectionId) -> StoreResult<ConnectionRecord> {
        self.get_doc(CONNECTIONS, id.as_uuid(), "connection").await
    }

    async fn create_connection(
        &self,
        connection: ConnectionRecord,
    ) -> StoreResult<ConnectionRecord> {
        sqlx::query(
            r#"INSERT INTO database_connections (id, doc, created_at) VALUES ($1, $2, $3)"#,
        )
        .bind(connection.id.as_uuid())
        .bind(encode(&connection)?)
        .bind(connection.created_at)
        .execute(&self.pool)
        .await?;
        Ok(connection)
    }

    async fn update_connection(
        &self,
        connection: ConnectionRecord,
    ) -> StoreResult<ConnectionRecord> {
        self.update_doc(
            CONNECTIONS,
            connection.id.as_uuid(),
            encode(&connection)?,
            "connection",
        )
        .await?;
        Ok(connection)
    }

    async fn delete_connection(&self, id: &ConnectionId) -> StoreResult<()> {
        self.delete_doc(CONNECTIONS, id.as_uuid(), "connection").await
    }

    async fn list_data_sources(&self) -> StoreResult<Vec<DataSource>> {
        self.list_docs(DATA_SOURCES).await
    }

    async fn get_data_source(&self, id: &DataSourceId) -> StoreResult<DataSource> {
        self.get_doc(DATA_SOURCES, id.as_uuid(), "data source").await
    }

    async fn create_data_source(&self, data_source: DataSource) -> StoreResult<DataSource> {
        sqlx::query(
            r#"INSERT INTO data_sources (id, connection_id, doc, created_at) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(data_source.id.as_uuid())
        .bind(data_source.connection_id.as_uuid())
        .bind(encode(&data_source)?)
        .bind(data_source.created_at)
        .execute(&self.pool)
        .await?;
        Ok(data_source)
    }

    async fn update_data_source(&self, data_source: DataSource) -> StoreResult<DataSource> {
        let result = sqlx::query(
            r#"UPDATE data_sources SET connection_id = $2, doc = $3 WHERE id = $1"#,
        )
        .bind(data_source.id.as_uuid())
        .bind(data_source.connection_id.as_uuid())
        .bind(encode(&data_source)?)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("data source".into()));
        }
        Ok(data_source)
    }

    async fn delete_data_source(&self, id: &DataSourceId) -> StoreResult<()> {
        self.delete_doc(DATA_SOURCES, id.as_uuid(), "data source").await
    }

    async fn list_dashboards(&self) -> StoreResult<Vec<Dashboard>> {
        self.list_docs(DASHBOARDS).await
    }

    async fn get_dashboard(&self, id: &DashboardId) -> StoreResult<Dashboard> {
        self.get_doc(DASHBOARDS, id.as_uuid(), "dashboard").await
    }

    async fn create_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard> {
        sqlx::query(
            r#"INSERT INTO dashboards (id, created_by, doc, created_at) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(dashboard.id.as_uuid())
        .bind(dashboard.created_by.as_uuid())
        .bind(encode(&dashboard)?)
        .bind(dashboard.created_at)
        .execute(&self.pool)
        .await?;
        self.refresh_count(DASHBOARDS, "tessera_dashboards_total")
            .await?;
        Ok(dashboard)
    }

    async fn update_dashboard(&self, dashboard: Dashboard) -> StoreResult<Dashboard> {
        self.update_doc(
            DASHBOARDS,
            dashboard.id.as_uuid(),
            encode(&dashboard)?,
            "dashboard",
        )
        .await?;
        Ok(dashboard)
    }

    async fn delete_dashboard(&self, id: &DashboardId) -> StoreResult<()> {
        self.delete_doc(DASHBOARDS, id.as_uuid(), "dashboard").await?;
        self.refresh_count(DASHBOARDS, "tessera_dashboards_total")
            .await
    }

    async fn list_shares(&self, dashboard_id: &DashboardId) -> StoreResult<Vec<DashboardShare>> {
        let rows = sqlx::query_as::<_, DocRow>(
            "SELECT doc FROM dashboard_shares WHERE dashboard_id = $1 ORDER BY created_at, id",
        )
        .bind(dashboard_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| decode(row.doc)).collect()
    }

    async fn list_shares_for_user(&self, user_id: &UserId) -> StoreResult<Vec<DashboardShare>> {
        let rows = sqlx::query_as::<_, DocRow>(
            "SELECT doc FROM dashboard_shares WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| decode(row.doc)).collect()
    }

    async fn upsert_share(&self, share: DashboardShare) -> StoreResult<ShareUpsert> {
        // `xmax = 0` only holds for a freshly inserted row version.
        let result = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO dashboard_shares (id, dashboard_id, user_id, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (dashboard_id, user_id) DO UPDATE
                SET doc = jsonb_set(dashboard_shares.doc, '{accessLevel}', EXCLUDED.doc -> 'accessLevel')
            RETURNING doc, (xmax = 0) AS inserted
            "#,
        )
        .bind(share.id.as_uuid())
        .bind(share.dashboard_id.as_uuid())
        .bind(share.user_id.as_uuid())
        .bind(encode(&share)?)
        .bind(share.created_at)
        .fetch_one(&self.pool)
        .await;
        let row = match result {
            Ok(row) => row,
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(StoreError::NotFound("dashboard".into()));
            }
            Err(err) => return Err(err.into()),
        };
        let op = if row.inserted { "created" } else { "updated" };
        metrics::counter!("tessera_dashboard_shares_total", "op" => op).increment(1);
        Ok(ShareUpsert {
            share: decode(row.doc)?,
            created: row.inserted,
        })
    }

    async fn delete_share(&self, dashboard_id: &DashboardId, user_id: &UserId) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM dashboard_shares WHERE dashboard_id = $1 AND user_id = $2")
                .bind(dashboard_id.as_uuid())
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("share".into()));
        }
        metrics::counter!("tessera_dashboard_shares_total", "op" => "revoked").increment(1);
        Ok(())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        self.list_docs(GROUPS).await
    }

    async fn get_group(&self, id: &GroupId) -> StoreResult<Group> {
        self.get_doc(GROUPS, id.as_uuid(), "group").await
    }

    async fn create_group(&self, group: Group) -> StoreResult<Group> {
        sqlx::query(r#"INSERT INTO groups (id, owner, doc, created_at) VALUES ($1, $2, $3, $4)"#)
            .bind(group.id.as_uuid())
            .bind(group.owner.as_uuid())
            .bind(encode(&group)?)
            .bind(group.created_at)
            .execute(&self.pool)
            .await?;
        self.refresh_count(GROUPS, "tessera_groups_total").await?;
        Ok(group)
    }

    async fn update_group(&self, group: Group) -> StoreResult<Group> {
        self.update_doc(GROUPS, group.id.as_uuid(), encode(&group)?, "group")
            .await?;
        Ok(group)
    }

    async fn delete_group(&self, id: &GroupId) -> StoreResult<()> {
        self.delete_doc(GROUPS, id.as_uuid(), "group").await?;
        self.refresh_count(GROUPS, "tessera_groups_total").await
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
