//! Route-level request gate.
//!
//! Every handler starts here: resolve the caller, then apply the role policy
//! for the route's [`Operation`] before any store is touched.
use crate::api::error::{ApiError, api_internal};
use crate::app::AppState;
use axum::http::HeaderMap;
use tessera_authz::{AuthzError, Identity, Operation, authorize};

/// Resolve the caller without requiring one; for anonymously readable routes.
pub async fn identify(state: &AppState, headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    state
        .identity
        .resolve(headers)
        .await
        .map_err(|err| api_internal("failed to resolve request identity", &err))
}

/// Resolve the caller and require the roles of `operation`.
pub async fn require(
    state: &AppState,
    headers: &HeaderMap,
    operation: Operation,
) -> Result<Identity, ApiError> {
    let identity = identify(state, headers).await?;
    match authorize(identity.as_ref(), operation) {
        Ok(identity) => {
            record("allow");
            Ok(identity.clone())
        }
        Err(err) => {
            match &err {
                AuthzError::Unauthenticated => {
                    record("unauthenticated");
                    tracing::debug!(?operation, "rejected anonymous request");
                }
                AuthzError::Forbidden { required, actual } => {
                    record("forbidden");
                    tracing::info!(
                        ?operation,
                        required = %required,
                        actual = %actual,
                        "rejected request lacking role"
                    );
                }
                _ => {}
            }
            Err(err.into())
        }
    }
}

fn record(outcome: &'static str) {
    metrics::counter!("tessera_authz_decisions_total", "outcome" => outcome).increment(1);
}
