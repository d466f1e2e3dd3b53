#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use chrono::Utc;
use portal::app::{AppState, build_router};
use portal::auth::identity::SessionIdentityProvider;
use portal::auth::keys::SessionKeys;
use portal::auth::session::SessionIssuer;
use portal::cache::ContextCache;
use portal::introspect::{ConnectionDescriptor, DatabaseIntrospector, IntrospectError};
use portal::model::UserRecord;
use portal::store::PortalStore;
use portal::store::memory::InMemoryStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera_authz::{Role, UserId};

pub type TestApp = axum::routing::RouterIntoService<Body, ()>;

pub const UNREACHABLE_HOST: &str = "unreachable.invalid";

/// Stand-in database driver: every host answers except [`UNREACHABLE_HOST`].
#[derive(Default)]
pub struct FakeIntrospector {
    pub catalog_calls: AtomicUsize,
}

impl FakeIntrospector {
    pub fn calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    fn reach(descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError> {
        if descriptor.host == UNREACHABLE_HOST {
            Err(IntrospectError::Connect(format!(
                "could not reach {}:{}",
                descriptor.host, descriptor.port
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DatabaseIntrospector for FakeIntrospector {
    async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError> {
        Self::reach(descriptor)
    }

    async fn list_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<String>, IntrospectError> {
        Self::reach(descriptor)?;
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["public".to_string(), "telemetry".to_string()])
    }

    async fn list_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
    ) -> Result<Vec<String>, IntrospectError> {
        Self::reach(descriptor)?;
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match schema.unwrap_or("public") {
            "telemetry" => vec!["readings".to_string()],
            _ => vec!["machines".to_string(), "sites".to_string()],
        })
    }
}

pub struct Harness {
    pub state: AppState,
    pub introspector: Arc<FakeIntrospector>,
}

pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

impl Harness {
    pub fn new() -> Self {
        let store: Arc<dyn PortalStore> = Arc::new(InMemoryStore::new());
        let sessions = Arc::new(
            SessionIssuer::new(&SessionKeys::from_seed([42u8; 32]), Duration::from_secs(600))
                .expect("session issuer"),
        );
        let introspector = Arc::new(FakeIntrospector::default());
        let state = AppState {
            api_version: "v1".to_string(),
            identity: Arc::new(SessionIdentityProvider::new(store.clone(), sessions.clone())),
            store,
            sessions,
            introspector: introspector.clone(),
            catalog_cache: Arc::new(ContextCache::new(Duration::from_secs(60))),
            login_path: "/login".to_string(),
        };
        Self {
            state,
            introspector,
        }
    }

    pub fn app(&self) -> TestApp {
        build_router(self.state.clone()).into_service()
    }

    /// Store a user directly and mint a session for it.
    pub async fn user(&self, email: &str, roles: &[Role]) -> TestUser {
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: email.split('@').next().unwrap_or("user").to_string(),
            middle_name: None,
            organization: None,
            department: None,
            roles: roles.iter().copied().collect(),
            password_hash: "not-a-real-hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored = self.state.store.create_user(record).await.expect("user");
        let session = self.state.sessions.mint(&stored.id).expect("token");
        TestUser {
            id: stored.id,
            token: session.token,
        }
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
