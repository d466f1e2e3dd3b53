//! Portal HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the helpers they share: path id parsing and
//! loading the live group roster the sharing engine evaluates against.
//!
//! # Handler shape
//! Every handler runs the request gate first, then decodes and validates its
//! body, and only then touches a store. Path ids are parsed after the gate so
//! an anonymous caller never learns whether an id is well formed.
pub mod admin;
pub mod auth;
pub mod connections;
pub mod dashboards;
pub mod data_sources;
pub mod error;
pub mod groups;
pub mod me;
pub mod openapi;
pub mod public;
pub mod shares;
pub mod system;
pub mod types;
pub mod users;
pub mod validation;

use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::app::AppState;
use std::str::FromStr;
use tessera_authz::GroupRoster;

/// Malformed ids name nothing that exists, so they answer 404.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| api_not_found())
}

/// Membership as of this request. Read through on every evaluation.
pub(crate) async fn load_roster(state: &AppState) -> Result<GroupRoster, ApiError> {
    let groups = state
        .store
        .list_groups()
        .await
        .map_err(|err| api_internal("failed to load groups", &err))?;
    Ok(groups.iter().map(|group| group.membership()).collect())
}
