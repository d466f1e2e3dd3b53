use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_authz::{
    ChartId, ConnectionId, DashboardAcl, DashboardId, DataSourceId, GroupId, LegacyAccess, UserId,
    Visibility,
};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ChartPosition {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One chart on a dashboard, bound to a data source through its connection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default)]
    pub id: ChartId,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub connection_id: ConnectionId,
    pub table_id: DataSourceId,
    pub x_axis: String,
    #[serde(default)]
    pub y_axis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    pub position: ChartPosition,
}

/// Dashboard with visibility already normalized.
///
/// Serialized documents always carry `isPublic`. Documents written before
/// that flag existed carry `access` instead; both fold into `visibility` on
/// read, see [`Visibility::normalize`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(
    rename_all = "camelCase",
    from = "DashboardDocument",
    into = "DashboardDocument"
)]
pub struct Dashboard {
    pub id: DashboardId,
    pub title: String,
    pub description: Option<String>,
    pub charts: Vec<ChartConfig>,
    pub group_ids: Vec<GroupId>,
    #[serde(rename = "isPublic")]
    #[schema(value_type = bool)]
    pub visibility: Visibility,
    #[schema(value_type = Option<Object>)]
    pub default_date_range: Option<Value>,
    pub show_date_range_picker: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub layout: Option<Value>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn acl(&self) -> DashboardAcl<'_> {
        DashboardAcl {
            id: &self.id,
            created_by: &self.created_by,
            visibility: self.visibility,
            group_ids: &self.group_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardDocument {
    id: DashboardId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    charts: Vec<ChartConfig>,
    #[serde(default)]
    group_ids: Vec<GroupId>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default, skip_serializing)]
    access: Option<LegacyAccess>,
    #[serde(default)]
    default_date_range: Option<Value>,
    #[serde(default)]
    show_date_range_picker: Option<bool>,
    #[serde(default)]
    layout: Option<Value>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DashboardDocument> for Dashboard {
    fn from(doc: DashboardDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            charts: doc.charts,
            group_ids: doc.group_ids,
            visibility: Visibility::normalize(doc.is_public, doc.access),
            default_date_range: doc.default_date_range,
            show_date_range_picker: doc.show_date_range_picker,
            layout: doc.layout,
            created_by: doc.created_by,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl From<Dashboard> for DashboardDocument {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            id: dashboard.id,
            title: dashboard.title,
            description: dashboard.description,
            charts: dashboard.charts,
            group_ids: dashboard.group_ids,
            is_public: Some(dashboard.visibility.is_public()),
            access: None,
            default_date_range: dashboard.default_date_range,
            show_date_range_picker: dashboard.show_date_range_picker,
            layout: dashboard.layout,
            created_by: dashboard.created_by,
            created_at: dashboard.created_at,
            updated_at: dashboard.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_document(access: &str) -> serde_json::Value {
        serde_json::json!({
            "id": DashboardId::new(),
            "title": "Plant overview",
            "access": access,
            "createdBy": UserId::new(),
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        })
    }

    #[test]
    fn legacy_public_document_reads_as_public() {
        let dashboard: Dashboard =
            serde_json::from_value(legacy_document("public")).expect("dashboard");
        assert_eq!(dashboard.visibility, Visibility::Public);
        assert!(dashboard.charts.is_empty());
    }

    #[test]
    fn legacy_shared_document_reads_as_restricted() {
        let dashboard: Dashboard =
            serde_json::from_value(legacy_document("shared")).expect("dashboard");
        assert_eq!(dashboard.visibility, Visibility::Restricted);
    }

    #[test]
    fn serialized_form_uses_is_public_only() {
        let dashboard: Dashboard =
            serde_json::from_value(legacy_document("public")).expect("dashboard");
        let json = serde_json::to_value(&dashboard).expect("json");
        assert_eq!(json["isPublic"], serde_json::Value::Bool(true));
        assert!(json.get("access").is_none());
        assert_eq!(json["groupIds"], serde_json::json!([]));
    }
}
