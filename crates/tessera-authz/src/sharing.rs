//! Dashboard sharing engine.
//!
//! # Purpose
//! Computes whether a viewer can see a dashboard and with which access level,
//! combining creatorship, public visibility, explicit per-user shares, and
//! group membership.
//!
//! # Key invariants
//! - Evaluation is first-match: creator, public, explicit share, groups, none.
//!   A creator always gets `edit`; an explicit `view` share is not upgraded by
//!   an `edit` group.
//! - Among matching groups the highest grant wins.
//! - Anonymous viewers only ever match the public branch.
//! - Legacy `access` values are folded into [`Visibility`] before evaluation.
use crate::{DashboardId, GroupId, MembershipIndex, UserId};
use serde::{Deserialize, Serialize};

/// Effective access a viewer holds on a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    None,
    View,
    Edit,
}

impl AccessLevel {
    pub fn can_read(self) -> bool {
        self >= AccessLevel::View
    }

    pub fn can_edit(self) -> bool {
        self == AccessLevel::Edit
    }
}

/// Level carried by a share or conferred by a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
    View,
    Edit,
}

impl From<GrantLevel> for AccessLevel {
    fn from(level: GrantLevel) -> Self {
        match level {
            GrantLevel::View => AccessLevel::View,
            GrantLevel::Edit => AccessLevel::Edit,
        }
    }
}

/// Pre-`isPublic` visibility field still present on older dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum LegacyAccess {
    Public,
    Private,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Restricted,
}

impl Visibility {
    /// Fold the current flag and the legacy field into one representation.
    ///
    /// `is_public` wins when present; otherwise `access: public` maps to
    /// [`Visibility::Public`] and everything else is restricted.
    pub fn normalize(is_public: Option<bool>, legacy: Option<LegacyAccess>) -> Self {
        match (is_public, legacy) {
            (Some(true), _) => Visibility::Public,
            (Some(false), _) => Visibility::Restricted,
            (None, Some(LegacyAccess::Public)) => Visibility::Public,
            (None, _) => Visibility::Restricted,
        }
    }

    pub fn from_flag(is_public: bool) -> Self {
        Self::normalize(Some(is_public), None)
    }

    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub visible: bool,
    pub access_level: AccessLevel,
}

impl AccessDecision {
    pub const NONE: AccessDecision = AccessDecision {
        visible: false,
        access_level: AccessLevel::None,
    };

    fn granted(level: impl Into<AccessLevel>) -> Self {
        Self {
            visible: true,
            access_level: level.into(),
        }
    }
}

/// The fields of a dashboard the engine evaluates.
#[derive(Debug, Clone, Copy)]
pub struct DashboardAcl<'a> {
    pub id: &'a DashboardId,
    pub created_by: &'a UserId,
    pub visibility: Visibility,
    pub group_ids: &'a [GroupId],
}

/// Explicit per-user grants on dashboards.
pub trait ShareLookup {
    fn grant_for(&self, dashboard: &DashboardId, user: &UserId) -> Option<GrantLevel>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareGrant {
    pub dashboard_id: DashboardId,
    pub user_id: UserId,
    pub level: GrantLevel,
}

impl ShareLookup for [ShareGrant] {
    fn grant_for(&self, dashboard: &DashboardId, user: &UserId) -> Option<GrantLevel> {
        // Stores keep one grant per pair; take the highest if older data holds more.
        self.iter()
            .filter(|grant| grant.dashboard_id == *dashboard && grant.user_id == *user)
            .map(|grant| grant.level)
            .max()
    }
}

impl ShareLookup for Vec<ShareGrant> {
    fn grant_for(&self, dashboard: &DashboardId, user: &UserId) -> Option<GrantLevel> {
        self.as_slice().grant_for(dashboard, user)
    }
}

pub struct SharingEngine<'a, M: ?Sized, S: ?Sized> {
    membership: &'a M,
    shares: &'a S,
}

impl<'a, M, S> SharingEngine<'a, M, S>
where
    M: MembershipIndex + ?Sized,
    S: ShareLookup + ?Sized,
{
    pub fn new(membership: &'a M, shares: &'a S) -> Self {
        Self { membership, shares }
    }

    pub fn visible_to(&self, dashboard: &DashboardAcl<'_>, viewer: Option<&UserId>) -> AccessDecision {
        if viewer == Some(dashboard.created_by) {
            return AccessDecision::granted(AccessLevel::Edit);
        }
        if dashboard.visibility.is_public() {
            return AccessDecision::granted(AccessLevel::View);
        }
        let Some(viewer) = viewer else {
            return AccessDecision::NONE;
        };
        if let Some(level) = self.shares.grant_for(dashboard.id, viewer) {
            return AccessDecision::granted(level);
        }
        dashboard
            .group_ids
            .iter()
            .filter(|group| self.membership.is_member(group, viewer))
            .filter_map(|group| self.membership.grant_of(group))
            .max()
            .map(AccessDecision::granted)
            .unwrap_or(AccessDecision::NONE)
    }

    /// Deleting needs more than effective `edit`: only the creator or an
    /// explicit `edit` share qualifies, group grants do not.
    pub fn can_delete(&self, dashboard: &DashboardAcl<'_>, viewer: &UserId) -> bool {
        viewer == dashboard.created_by
            || self.shares.grant_for(dashboard.id, viewer) == Some(GrantLevel::Edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroupMembership, GroupRoster};
    use std::collections::BTreeSet;

    struct Fixture {
        id: DashboardId,
        creator: UserId,
        groups: Vec<GroupId>,
        visibility: Visibility,
    }

    impl Fixture {
        fn new(visibility: Visibility) -> Self {
            Self {
                id: DashboardId::new(),
                creator: UserId::new(),
                groups: Vec::new(),
                visibility,
            }
        }

        fn acl(&self) -> DashboardAcl<'_> {
            DashboardAcl {
                id: &self.id,
                created_by: &self.creator,
                visibility: self.visibility,
                group_ids: &self.groups,
            }
        }
    }

    fn group(grant: GrantLevel, members: &[UserId]) -> GroupMembership {
        GroupMembership {
            id: GroupId::new(),
            grant,
            member_ids: members.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn creator_gets_edit_without_shares_or_groups() {
        let dashboard = Fixture::new(Visibility::Restricted);
        let roster = GroupRoster::new();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        let decision = engine.visible_to(&dashboard.acl(), Some(&dashboard.creator));
        assert_eq!(decision, AccessDecision::granted(AccessLevel::Edit));
    }

    #[test]
    fn public_dashboard_is_view_for_anonymous_and_strangers() {
        let dashboard = Fixture::new(Visibility::Public);
        let roster = GroupRoster::new();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        assert_eq!(
            engine.visible_to(&dashboard.acl(), None).access_level,
            AccessLevel::View
        );
        assert_eq!(
            engine.visible_to(&dashboard.acl(), Some(&UserId::new())),
            AccessDecision::granted(AccessLevel::View)
        );
    }

    #[test]
    fn restricted_dashboard_is_hidden_from_anonymous() {
        let dashboard = Fixture::new(Visibility::Restricted);
        let roster = GroupRoster::new();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        assert_eq!(engine.visible_to(&dashboard.acl(), None), AccessDecision::NONE);
    }

    #[test]
    fn explicit_share_wins_over_groups() {
        let viewer = UserId::new();
        let editors = group(GrantLevel::Edit, &[viewer]);
        let mut dashboard = Fixture::new(Visibility::Restricted);
        dashboard.groups.push(editors.id);
        let roster: GroupRoster = [editors].into_iter().collect();
        let shares = vec![ShareGrant {
            dashboard_id: dashboard.id,
            user_id: viewer,
            level: GrantLevel::View,
        }];
        let engine = SharingEngine::new(&roster, &shares);
        assert_eq!(
            engine.visible_to(&dashboard.acl(), Some(&viewer)).access_level,
            AccessLevel::View
        );
    }

    #[test]
    fn highest_group_grant_wins() {
        let member = UserId::new();
        let viewers = group(GrantLevel::View, &[member]);
        let editors = group(GrantLevel::Edit, &[member]);
        let mut dashboard = Fixture::new(Visibility::Restricted);
        dashboard.groups = vec![viewers.id, editors.id];
        let roster: GroupRoster = [viewers, editors].into_iter().collect();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        assert_eq!(
            engine.visible_to(&dashboard.acl(), Some(&member)),
            AccessDecision::granted(AccessLevel::Edit)
        );
    }

    #[test]
    fn groups_not_listed_on_the_dashboard_do_not_count() {
        let member = UserId::new();
        let unrelated = group(GrantLevel::Edit, &[member]);
        let dashboard = Fixture::new(Visibility::Restricted);
        let roster: GroupRoster = [unrelated].into_iter().collect();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        assert_eq!(
            engine.visible_to(&dashboard.acl(), Some(&member)),
            AccessDecision::NONE
        );
    }

    #[test]
    fn visible_iff_creator_public_share_or_group() {
        let creator_case = Fixture::new(Visibility::Restricted);
        let stranger = UserId::new();
        let roster = GroupRoster::new();
        let shares: Vec<ShareGrant> = Vec::new();
        let engine = SharingEngine::new(&roster, &shares);
        assert!(!engine.visible_to(&creator_case.acl(), Some(&stranger)).visible);
        assert!(engine
            .visible_to(&creator_case.acl(), Some(&creator_case.creator))
            .visible);
    }

    #[test]
    fn delete_requires_creator_or_explicit_edit_share() {
        let member = UserId::new();
        let sharee = UserId::new();
        let editors = group(GrantLevel::Edit, &[member]);
        let mut dashboard = Fixture::new(Visibility::Restricted);
        dashboard.groups.push(editors.id);
        let roster: GroupRoster = [editors].into_iter().collect();
        let shares = vec![ShareGrant {
            dashboard_id: dashboard.id,
            user_id: sharee,
            level: GrantLevel::Edit,
        }];
        let engine = SharingEngine::new(&roster, &shares);
        assert!(engine.can_delete(&dashboard.acl(), &dashboard.creator));
        assert!(engine.can_delete(&dashboard.acl(), &sharee));
        assert!(!engine.can_delete(&dashboard.acl(), &member));
    }

    #[test]
    fn legacy_access_normalizes_to_one_branch() {
        assert_eq!(
            Visibility::normalize(None, Some(LegacyAccess::Public)),
            Visibility::normalize(Some(true), None)
        );
        assert_eq!(
            Visibility::normalize(None, Some(LegacyAccess::Shared)),
            Visibility::Restricted
        );
        assert_eq!(Visibility::normalize(None, None), Visibility::Restricted);
        assert_eq!(
            Visibility::normalize(Some(false), Some(LegacyAccess::Public)),
            Visibility::Restricted
        );
    }

    #[test]
    fn access_decision_serializes_camel_case() {
        let json = serde_json::to_value(AccessDecision::granted(GrantLevel::View)).expect("json");
        assert_eq!(json, serde_json::json!({"visible": true, "accessLevel": "view"}));
    }
}
