use crate::{AuthzError, AuthzResult, Role, RoleSet, UserId};

/// Authenticated caller as seen by the policy functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub roles: RoleSet,
}

impl Identity {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}

/// Route-level operations and the roles that unlock them.
///
/// Routes readable anonymously (dashboard listing, single dashboard reads,
/// the public dashboard view) never reach the role policy and have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ManageConnections,
    ManageDataSources,
    CreateDashboard,
    ManageShares,
    AdministerUsers,
    /// Any signed-in user: groups, the user roster, profile, dashboard mutation.
    Authenticated,
}

impl Operation {
    pub fn required_roles(self) -> RoleSet {
        match self {
            Operation::ManageConnections => RoleSet::from_iter([Role::DbAdmin]),
            Operation::ManageDataSources => RoleSet::from_iter([Role::MetadataEditor]),
            Operation::CreateDashboard | Operation::ManageShares => {
                RoleSet::from_iter([Role::DashboardCreator])
            }
            Operation::AdministerUsers => RoleSet::from_iter([Role::UserAdmin]),
            Operation::Authenticated => RoleSet::new(),
        }
    }
}

/// Decide whether `identity` may run a route requiring any of `required`.
///
/// An empty `required` set admits every authenticated caller. The decision
/// never looks at a resource instance.
pub fn check<'a>(identity: Option<&'a Identity>, required: &RoleSet) -> AuthzResult<&'a Identity> {
    let identity = identity.ok_or(AuthzError::Unauthenticated)?;
    if required.is_empty() || identity.roles.intersects(required) {
        return Ok(identity);
    }
    Err(AuthzError::Forbidden {
        required: required.clone(),
        actual: identity.roles.clone(),
    })
}

pub fn authorize(identity: Option<&Identity>, operation: Operation) -> AuthzResult<&Identity> {
    check(identity, &operation.required_roles())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[Role]) -> Identity {
        Identity::new(UserId::new(), roles.iter().copied())
    }

    #[test]
    fn anonymous_is_unauthenticated_even_for_open_routes() {
        assert_eq!(
            check(None, &RoleSet::new()),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn empty_requirement_admits_any_identity() {
        let nobody = user(&[]);
        assert!(check(Some(&nobody), &RoleSet::new()).is_ok());
    }

    #[test]
    fn any_overlapping_role_is_enough() {
        let editor = user(&[Role::Public, Role::MetadataEditor]);
        let required = RoleSet::from_iter([Role::DbAdmin, Role::MetadataEditor]);
        let allowed = check(Some(&editor), &required).expect("allowed");
        assert_eq!(allowed.user_id, editor.user_id);
    }

    #[test]
    fn missing_role_reports_required_and_actual() {
        let viewer = user(&[Role::Public]);
        let err = authorize(Some(&viewer), Operation::ManageConnections).expect_err("denied");
        assert_eq!(
            err.to_string(),
            "Required role: db_admin, but user has: public"
        );
    }

    #[test]
    fn public_role_never_unlocks_a_gated_operation() {
        let viewer = user(&[Role::Public]);
        for op in [
            Operation::ManageConnections,
            Operation::ManageDataSources,
            Operation::CreateDashboard,
            Operation::ManageShares,
            Operation::AdministerUsers,
        ] {
            assert!(authorize(Some(&viewer), op).is_err(), "{op:?}");
        }
    }

    #[test]
    fn operation_table_matches_route_contract() {
        assert!(Operation::ManageConnections.required_roles().contains(Role::DbAdmin));
        assert!(Operation::ManageDataSources.required_roles().contains(Role::MetadataEditor));
        assert!(Operation::CreateDashboard.required_roles().contains(Role::DashboardCreator));
        assert!(Operation::ManageShares.required_roles().contains(Role::DashboardCreator));
        assert!(Operation::AdministerUsers.required_roles().contains(Role::UserAdmin));
        assert!(Operation::Authenticated.required_roles().is_empty());
    }
}
