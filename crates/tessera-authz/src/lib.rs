//! Tessera authorization primitives shared by the portal service.
//!
//! # Purpose
//! Holds the role model, typed identifiers, and the pure decision functions
//! that gate every portal operation: the route-level role policy, the
//! per-resource ownership gate, the group membership index, and the
//! dashboard sharing engine.
//!
//! # How it fits
//! The portal resolves an [`Identity`] from the request, asks [`check`] or
//! [`authorize`] whether the route may run, and afterwards consults
//! [`can_mutate`] or a [`SharingEngine`] for object-level decisions. Nothing in
//! this crate performs I/O; callers load the documents and hand in views.
//!
//! # Key invariants
//! - Roles are a closed enumeration; `public` confers no privilege.
//! - Role sets are de-duplicated at construction ([`RoleSet`] is a set).
//! - Legacy dashboard visibility is normalized into [`Visibility`] before the
//!   sharing engine sees it, so a public dashboard has exactly one code path.
//! - Membership is evaluated against the groups handed in per evaluation; no
//!   membership state is cached here.
//!
//! # Examples
//! ```rust
//! use tessera_authz::{Identity, Operation, Role, UserId, authorize};
//!
//! let admin = Identity::new(UserId::new(), [Role::DbAdmin]);
//! assert!(authorize(Some(&admin), Operation::ManageConnections).is_ok());
//! assert!(authorize(None, Operation::ManageConnections).is_err());
//! ```
//!
//! # Common pitfalls
//! - Calling the sharing engine with a stale group snapshot hides membership
//!   changes; load groups at request time.

mod errors;
mod ids;
mod membership;
mod ownership;
mod policy;
mod role;
mod sharing;

pub use errors::{AuthzError, AuthzResult};
pub use ids::{ChartId, ConnectionId, DashboardId, DataSourceId, GroupId, ShareId, UserId};
pub use membership::{GroupMembership, GroupRoster, MembershipIndex, dedup_members};
pub use ownership::{OwnedResource, can_mutate, can_read};
pub use policy::{Identity, Operation, authorize, check};
pub use role::{Role, RoleSet};
pub use sharing::{
    AccessDecision, AccessLevel, DashboardAcl, GrantLevel, LegacyAccess, ShareGrant, ShareLookup,
    SharingEngine, Visibility,
};
