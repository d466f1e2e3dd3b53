use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_authz::{DashboardId, GrantLevel, ShareGrant, ShareId, UserId};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardShare {
    pub id: ShareId,
    pub dashboard_id: DashboardId,
    pub user_id: UserId,
    pub access_level: GrantLevel,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl DashboardShare {
    pub fn grant(&self) -> ShareGrant {
        ShareGrant {
            dashboard_id: self.dashboard_id,
            user_id: self.user_id,
            level: self.access_level,
        }
    }
}
