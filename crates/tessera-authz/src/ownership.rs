use crate::{Identity, Role, UserId};

/// Resource kinds guarded by the ownership gate.
///
/// Dashboards are absent on purpose: their rights come from the sharing engine.
#[derive(Debug, Clone, Copy)]
pub enum OwnedResource<'a> {
    Connection,
    DataSource,
    Group { owner: &'a UserId },
}

/// Whether `actor` may update or delete an instance of `resource`.
///
/// Connections and data sources are collection-wide: holding the role is
/// enough, whoever created the row. Groups belong to their owner alone and
/// roles play no part.
pub fn can_mutate(resource: OwnedResource<'_>, actor: &Identity) -> bool {
    match resource {
        OwnedResource::Connection => actor.has_role(Role::DbAdmin),
        OwnedResource::DataSource => actor.has_role(Role::MetadataEditor),
        OwnedResource::Group { owner } => *owner == actor.user_id,
    }
}

/// Read access follows the mutation rule for every owned resource.
pub fn can_read(resource: OwnedResource<'_>, actor: &Identity) -> bool {
    can_mutate(resource, actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoleSet;

    #[test]
    fn any_db_admin_may_mutate_any_connection() {
        let creator = Identity::new(UserId::new(), [Role::DbAdmin]);
        let other = Identity::new(UserId::new(), [Role::DbAdmin]);
        assert!(can_mutate(OwnedResource::Connection, &creator));
        assert!(can_mutate(OwnedResource::Connection, &other));
        let editor = Identity::new(UserId::new(), [Role::MetadataEditor]);
        assert!(!can_mutate(OwnedResource::Connection, &editor));
    }

    #[test]
    fn data_sources_follow_metadata_editor() {
        let editor = Identity::new(UserId::new(), [Role::MetadataEditor]);
        assert!(can_mutate(OwnedResource::DataSource, &editor));
        let admin = Identity::new(UserId::new(), [Role::DbAdmin]);
        assert!(!can_mutate(OwnedResource::DataSource, &admin));
    }

    #[test]
    fn group_owner_only_regardless_of_roles() {
        let owner = Identity::new(UserId::new(), []);
        let everything = Identity {
            user_id: UserId::new(),
            roles: RoleSet::from_iter(Role::ALL),
        };
        let resource = OwnedResource::Group {
            owner: &owner.user_id,
        };
        assert!(can_mutate(resource, &owner));
        assert!(can_read(resource, &owner));
        assert!(!can_mutate(resource, &everything));
        assert!(!can_read(resource, &everything));
    }
}
