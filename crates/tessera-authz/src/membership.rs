//! Group membership index.
//!
//! The index is a view over group documents the caller loaded for the current
//! evaluation. It owns no state of its own, so a membership change is visible
//! to the very next evaluation that reloads the groups.
use crate::{GrantLevel, GroupId, UserId};
use std::collections::{BTreeSet, HashMap, HashSet};

pub trait MembershipIndex {
    fn is_member(&self, group: &GroupId, user: &UserId) -> bool;
    fn groups_of(&self, user: &UserId) -> BTreeSet<GroupId>;
    /// Access level membership in `group` confers, if the group exists.
    fn grant_of(&self, group: &GroupId) -> Option<GrantLevel>;
}

/// The slice of a group document the index needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembership {
    pub id: GroupId,
    pub grant: GrantLevel,
    pub member_ids: BTreeSet<UserId>,
}

/// Read-through membership view built from live group documents.
#[derive(Debug, Clone, Default)]
pub struct GroupRoster {
    groups: HashMap<GroupId, GroupMembership>,
}

impl GroupRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<GroupMembership> for GroupRoster {
    fn from_iter<I: IntoIterator<Item = GroupMembership>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().map(|group| (group.id, group)).collect(),
        }
    }
}

impl MembershipIndex for GroupRoster {
    fn is_member(&self, group: &GroupId, user: &UserId) -> bool {
        self.groups
            .get(group)
            .is_some_and(|entry| entry.member_ids.contains(user))
    }

    fn groups_of(&self, user: &UserId) -> BTreeSet<GroupId> {
        self.groups
            .values()
            .filter(|entry| entry.member_ids.contains(user))
            .map(|entry| entry.id)
            .collect()
    }

    fn grant_of(&self, group: &GroupId) -> Option<GrantLevel> {
        self.groups.get(group).map(|entry| entry.grant)
    }
}

/// Drop repeated member ids, keeping the first occurrence of each.
pub fn dedup_members(ids: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
