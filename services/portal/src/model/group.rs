use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_authz::{GrantLevel, GroupId, GroupMembership, UserId};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub role: GrantLevel,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
    pub owner: UserId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn membership(&self) -> GroupMembership {
        GroupMembership {
            id: self.id,
            grant: self.role,
            member_ids: self.member_ids.iter().copied().collect(),
        }
    }
}
