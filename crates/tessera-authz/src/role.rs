use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Coarse permission bucket held by a user.
///
/// The set is closed and flat: no role implies another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    DbAdmin,
    MetadataEditor,
    DashboardCreator,
    UserAdmin,
    Public,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::DbAdmin,
        Role::MetadataEditor,
        Role::DashboardCreator,
        Role::UserAdmin,
        Role::Public,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::DbAdmin => "db_admin",
            Role::MetadataEditor => "metadata_editor",
            Role::DashboardCreator => "dashboard_creator",
            Role::UserAdmin => "user_admin",
            Role::Public => "public",
        }
    }

    /// `public` is a cosmetic default and never satisfies a gate on its own.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, Role::Public)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> AuthzResult<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::InvalidRole(value.to_string()))
    }
}

/// De-duplicated set of roles.
///
/// Deserializing `["db_admin", "db_admin"]` yields a single `db_admin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "openapi",
    derive(utoipa::ToSchema),
    schema(value_type = Vec<Role>)
)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_privileged() -> Self {
        Role::ALL.into_iter().filter(Role::is_privileged).collect()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.intersection(&other.0).next().is_some()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
