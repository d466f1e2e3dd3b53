//! Introspection of the external databases users register.
//!
//! # Purpose
//! Answer "can we connect", "which schemas exist" and "which tables live in a
//! schema" for a stored or proposed connection. Each engine has a driver; the
//! [`DriverRegistry`] dispatches on [`DatabaseType`].
//!
//! # Key invariants
//! - Descriptors carry the connection password, so their `Debug` output
//!   redacts it and their cache key is a digest, never the plaintext.
//! - Every driver call is bounded by a timeout.
use crate::model::{ConnectionRecord, DatabaseType};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod clickhouse;
pub mod postgres;

pub const DEFAULT_DRIVER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for IntrospectError {
    fn from(err: sqlx::Error) -> Self {
        IntrospectError::Query(err.to_string())
    }
}

impl From<reqwest::Error> for IntrospectError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            IntrospectError::Connect(err.to_string())
        } else {
            IntrospectError::Query(err.to_string())
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub kind: DatabaseType,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&ConnectionRecord> for ConnectionDescriptor {
    fn from(record: &ConnectionRecord) -> Self {
        Self {
            kind: record.kind,
            host: record.host.clone(),
            port: record.port,
            database: record.database.clone(),
            username: record.username.clone(),
            password: record.password.clone(),
        }
    }
}

impl ConnectionDescriptor {
    /// SHA-256 hex over every field, password included.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let port = self.port.to_string();
        for part in [
            self.kind.as_str(),
            self.host.as_str(),
            port.as_str(),
            self.database.as_str(),
            self.username.as_str(),
            self.password.as_str(),
        ] {
            // Length prefix keeps ("ab","c") and ("a","bc") apart.
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
pub trait DatabaseIntrospector: Send + Sync {
    async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError>;
    async fn list_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<String>, IntrospectError>;
    /// `schema` defaults to the engine's usual one when absent.
    async fn list_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
    ) -> Result<Vec<String>, IntrospectError>;
}

pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, IntrospectError>>,
) -> Result<T, IntrospectError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| IntrospectError::Timeout(timeout))?
}

/// One driver per engine.
#[derive(Clone)]
pub struct DriverRegistry {
    postgres: Arc<dyn DatabaseIntrospector>,
    clickhouse: Arc<dyn DatabaseIntrospector>,
}

impl DriverRegistry {
    pub fn new(
        postgres: Arc<dyn DatabaseIntrospector>,
        clickhouse: Arc<dyn DatabaseIntrospector>,
    ) -> Self {
        Self {
            postgres,
            clickhouse,
        }
    }

    pub fn with_default_drivers(timeout: Duration) -> Result<Self, IntrospectError> {
        Ok(Self::new(
            Arc::new(postgres::PostgresIntrospector::new(timeout)),
            Arc::new(clickhouse::ClickHouseIntrospector::new(timeout)?),
        ))
    }

    fn driver(&self, kind: DatabaseType) -> &dyn DatabaseIntrospector {
        match kind {
            DatabaseType::Postgresql => self.postgres.as_ref(),
            DatabaseType::Clickhouse => self.clickhouse.as_ref(),
        }
    }
}

#[async_trait]
impl DatabaseIntrospector for DriverRegistry {
    async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError> {
        self.driver(descriptor.kind).test(descriptor).await
    }

    async fn list_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<String>, IntrospectError> {
        self.driver(descriptor.kind).list_schemas(descriptor).await
    }

    async fn list_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
    ) -> Result<Vec<String>, IntrospectError> {
        self.driver(descriptor.kind)
            .list_tables(descriptor, schema)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: DatabaseType) -> ConnectionDescriptor {
        ConnectionDescriptor {
            kind,
            host: "db.internal".to_string(),
            port: 5432,
            database: "telemetry".to_string(),
            username: "reader".to_string(),
            password: "hunter22".to_string(),
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl DatabaseIntrospector for Named {
        async fn test(&self, _: &ConnectionDescriptor) -> Result<(), IntrospectError> {
            Ok(())
        }

        async fn list_schemas(
            &self,
            _: &ConnectionDescriptor,
        ) -> Result<Vec<String>, IntrospectError> {
            Ok(vec![self.0.to_string()])
        }

        async fn list_tables(
            &self,
            _: &ConnectionDescriptor,
            schema: Option<&str>,
        ) -> Result<Vec<String>, IntrospectError> {
            Ok(vec![format!("{}:{}", self.0, schema.unwrap_or("-"))])
        }
    }

    #[test]
    fn fingerprint_covers_the_password() {
        let a = descriptor(DatabaseType::Postgresql);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.password = "hunter23".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert!(!a.fingerprint().contains("hunter22"));
    }

    #[test]
    fn fingerprint_separates_adjacent_fields() {
        let mut a = descriptor(DatabaseType::Postgresql);
        let mut b = a.clone();
        a.host = "ab".to_string();
        a.database = "c".to_string();
        b.host = "a".to_string();
        b.database = "bc".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", descriptor(DatabaseType::Clickhouse));
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn registry_dispatches_on_kind() {
        let registry = DriverRegistry::new(Arc::new(Named("pg")), Arc::new(Named("ch")));
        assert_eq!(
            registry
                .list_schemas(&descriptor(DatabaseType::Postgresql))
                .await
                .expect("pg"),
            vec!["pg"]
        );
        assert_eq!(
            registry
                .list_tables(&descriptor(DatabaseType::Clickhouse), Some("default"))
                .await
                .expect("ch"),
            vec!["ch:default"]
        );
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let err = with_timeout(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, IntrospectError>(())
        })
        .await
        .expect_err("timeout");
        assert!(matches!(err, IntrospectError::Timeout(_)));
    }
}
