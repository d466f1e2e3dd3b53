//! PostgreSQL catalog driver over `information_schema`.
use super::{ConnectionDescriptor, DatabaseIntrospector, IntrospectError, with_timeout};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};
use std::time::Duration;

const DEFAULT_SCHEMA: &str = "public";

const SCHEMAS_SQL: &str = "SELECT schema_name::text FROM information_schema.schemata \
     WHERE schema_name NOT IN ('pg_catalog', 'information_schema') \
     AND schema_name NOT LIKE 'pg\\_toast%' \
     AND schema_name NOT LIKE 'pg\\_temp%' \
     ORDER BY schema_name";

const TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type IN ('BASE TABLE', 'VIEW') \
     ORDER BY table_name";

#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
    timeout: Duration,
}

impl PostgresIntrospector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .database(&descriptor.database)
            .username(&descriptor.username)
            .password(&descriptor.password)
            .application_name("tessera-portal")
    }

    async fn connect(descriptor: &ConnectionDescriptor) -> Result<PgConnection, IntrospectError> {
        Self::options(descriptor)
            .connect()
            .await
            .map_err(|err| IntrospectError::Connect(err.to_string()))
    }
}

#[async_trait]
impl DatabaseIntrospector for PostgresIntrospector {
    async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError> {
        with_timeout(self.timeout, async {
            let mut conn = Self::connect(descriptor).await?;
            conn.ping().await?;
            conn.close().await?;
            Ok(())
        })
        .await
    }

    async fn list_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<String>, IntrospectError> {
        with_timeout(self.timeout, async {
            let mut conn = Self::connect(descriptor).await?;
            let names = sqlx::query_scalar::<_, String>(SCHEMAS_SQL)
                .fetch_all(&mut conn)
                .await?;
            conn.close().await?;
            Ok(names)
        })
        .await
    }

    async fn list_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
    ) -> Result<Vec<String>, IntrospectError> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        with_timeout(self.timeout, async {
            let mut conn = Self::connect(descriptor).await?;
            let names = sqlx::query_scalar::<_, String>(TABLES_SQL)
                .bind(schema)
                .fetch_all(&mut conn)
                .await?;
            conn.close().await?;
            Ok(names)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DatabaseType;

    #[tokio::test]
    async fn unreachable_host_fails_fast() {
        let driver = PostgresIntrospector::new(Duration::from_secs(2));
        let descriptor = ConnectionDescriptor {
            kind: DatabaseType::Postgresql,
            host: "127.0.0.1".to_string(),
            // Port 1 is reserved and closed on test machines.
            port: 1,
            database: "nowhere".to_string(),
            username: "nobody".to_string(),
            password: "nothing".to_string(),
        };
        let err = driver.test(&descriptor).await.expect_err("unreachable");
        assert!(matches!(
            err,
            IntrospectError::Connect(_) | IntrospectError::Timeout(_)
        ));
    }
}
