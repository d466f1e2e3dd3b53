//! Request identity resolution.
//!
//! # Purpose
//! Turn an inbound request into the acting [`Identity`], or `None` for an
//! anonymous caller. Handlers never look at credentials themselves.
//!
//! # Key invariants
//! - A missing, malformed, expired or foreign token resolves to anonymous, not
//!   to an error; the role policy then answers 401 where a caller is needed.
//! - Roles are read from the stored user on every request.
use crate::auth::session::SessionIssuer;
use crate::store::{PortalStore, StoreError, StoreResult};
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use std::sync::Arc;
use tessera_authz::Identity;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Storage failures surface as `Err`; everything else that prevents
    /// authentication yields `Ok(None)`.
    async fn resolve(&self, headers: &HeaderMap) -> StoreResult<Option<Identity>>;
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves portal session tokens against the user store.
pub struct SessionIdentityProvider {
    store: Arc<dyn PortalStore>,
    sessions: Arc<SessionIssuer>,
}

impl SessionIdentityProvider {
    pub fn new(store: Arc<dyn PortalStore>, sessions: Arc<SessionIssuer>) -> Self {
        Self { store, sessions }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentityProvider {
    async fn resolve(&self, headers: &HeaderMap) -> StoreResult<Option<Identity>> {
        let Some(token) = extract_bearer(headers) else {
            return Ok(None);
        };
        let user_id = match self
            .sessions
            .verify(token)
            .and_then(|claims| claims.user_id())
        {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                return Ok(None);
            }
        };
        match self.store.get_user(&user_id).await {
            Ok(user) => Ok(Some(user.identity())),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(%user_id, "session for unknown user");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
