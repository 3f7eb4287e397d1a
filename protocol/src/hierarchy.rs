use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::pnl::PnlRow;
use crate::user::UserRole;

/// Aggregation level the dashboard is currently drilled into. The mode
/// selects both the hierarchy endpoint and the grid column layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HierarchyMode {
    Cluster,
    Account,
    Project,
    Resource,
}

impl HierarchyMode {
    /// The level a freshly opened dashboard lands on, by caller role.
    pub fn default_for_role(role: UserRole) -> Self {
        match role {
            UserRole::ProjectManager => HierarchyMode::Project,
            UserRole::AccountDirector => HierarchyMode::Account,
            UserRole::Admin | UserRole::ClusterHead => HierarchyMode::Cluster,
        }
    }

    /// Fixed grid columns for this mode.
    pub fn columns(&self) -> &'static [GridColumn] {
        match self {
            HierarchyMode::Cluster => CLUSTER_COLUMNS,
            HierarchyMode::Account => ACCOUNT_COLUMNS,
            HierarchyMode::Project => PROJECT_COLUMNS,
            HierarchyMode::Resource => RESOURCE_COLUMNS,
        }
    }
}

/// Static descriptor of one grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridColumn {
    pub key: &'static str,
    pub label: &'static str,
    pub numeric: bool,
}

const fn col(key: &'static str, label: &'static str, numeric: bool) -> GridColumn {
    GridColumn { key, label, numeric }
}

const CLUSTER_COLUMNS: &[GridColumn] = &[
    col("clusterName", "Cluster", false),
    col("revenue", "Revenue", true),
    col("cost", "Cost", true),
    col("grossProfit", "Gross Profit", true),
    col("margin", "Margin", true),
    col("accountCount", "Accounts", true),
    col("actions", "Actions", false),
];

const ACCOUNT_COLUMNS: &[GridColumn] = &[
    col("accountName", "Account", false),
    col("revenue", "Revenue", true),
    col("cost", "Cost", true),
    col("grossProfit", "Gross Profit", true),
    col("margin", "Margin", true),
    col("projectCount", "Projects", true),
    col("actions", "Actions", false),
];

const PROJECT_COLUMNS: &[GridColumn] = &[
    col("projectName", "Project", false),
    col("revenue", "Revenue", true),
    col("cost", "Cost", true),
    col("grossProfit", "Gross Profit", true),
    col("margin", "Margin", true),
    col("headcount", "Headcount", true),
    col("utilization", "Utilization", true),
    col("actions", "Actions", false),
];

const RESOURCE_COLUMNS: &[GridColumn] = &[
    col("cluster", "Cluster", false),
    col("account", "Account", false),
    col("project", "Project", false),
    col("year", "Year", true),
    col("month", "Month", false),
    col("revenue", "Revenue", true),
    col("cost", "Cost", true),
    col("grossProfit", "Gross Profit", true),
    col("margin", "Margin", true),
    col("headcount", "Headcount", true),
    col("utilization", "Utilization", true),
];

/// Rolled-up financials shared by every hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub gross_profit: f64,
    #[serde(default)]
    pub margin: f64,
}

/// Per-employee line embedded under a project node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetail {
    pub employee_id: String,
    pub employee_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
}

/// Cluster-level rollup from `GET /pnl/hierarchy/cluster`.
///
/// Identifying fields are optional on purpose: rows occasionally arrive
/// with a generic `id`/`key` instead, which is captured in `extra` and
/// consulted by [`HierarchyRow::entity_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(default)]
    pub account_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<AccountNode>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Account-level rollup. `cluster_id` carries the parent link used by the
/// Ask-Nova scoping step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<ProjectNode>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Project-level rollup with its own staffing figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(default)]
    pub headcount: f64,
    #[serde(default)]
    pub utilization: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceDetail>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One grid row at the active aggregation level. Resource mode renders the
/// flat P&L facts directly.
///
/// Rows are always parsed as the typed node of the endpoint that produced
/// them; the enum only ever serializes (untagged) when a row is embedded
/// as chat context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HierarchyRow {
    Cluster(ClusterNode),
    Account(AccountNode),
    Project(ProjectNode),
    Resource(PnlRow),
}

impl HierarchyRow {
    pub fn mode(&self) -> HierarchyMode {
        match self {
            HierarchyRow::Cluster(_) => HierarchyMode::Cluster,
            HierarchyRow::Account(_) => HierarchyMode::Account,
            HierarchyRow::Project(_) => HierarchyMode::Project,
            HierarchyRow::Resource(_) => HierarchyMode::Resource,
        }
    }

    /// Resolve the row's identifying key: a generic `id` wins, then the
    /// level-specific id, then a generic `key`. First non-null wins.
    pub fn entity_id(&self) -> Option<String> {
        let (extra, own_id) = match self {
            HierarchyRow::Cluster(node) => (Some(&node.extra), node.cluster_id.clone()),
            HierarchyRow::Account(node) => (Some(&node.extra), node.account_id.clone()),
            HierarchyRow::Project(node) => (Some(&node.extra), node.project_id.clone()),
            HierarchyRow::Resource(row) => (None, Some(row.id.clone())),
        };
        let probe = |field: &str| -> Option<String> {
            extra.and_then(|map| map.get(field)).and_then(value_as_key)
        };
        probe("id").or(own_id).or_else(|| probe("key"))
    }

    /// Parent identifier propagated into the Ask-Nova scope: the owning
    /// cluster for accounts, the owning account for projects.
    pub fn parent_id(&self) -> Option<String> {
        match self {
            HierarchyRow::Account(node) => node.cluster_id.clone(),
            HierarchyRow::Project(node) => node.account_id.clone(),
            HierarchyRow::Cluster(_) | HierarchyRow::Resource(_) => None,
        }
    }

    pub fn display_name(&self) -> String {
        let name = match self {
            HierarchyRow::Cluster(node) => node.cluster_name.clone(),
            HierarchyRow::Account(node) => node.account_name.clone(),
            HierarchyRow::Project(node) => node.project_name.clone(),
            HierarchyRow::Resource(row) => Some(row.project.clone()),
        };
        name.or_else(|| self.entity_id()).unwrap_or_default()
    }

    pub fn metrics(&self) -> Metrics {
        match self {
            HierarchyRow::Cluster(node) => node.metrics,
            HierarchyRow::Account(node) => node.metrics,
            HierarchyRow::Project(node) => node.metrics,
            HierarchyRow::Resource(row) => Metrics {
                revenue: row.revenue,
                cost: row.cost,
                gross_profit: row.gross_profit,
                margin: row.margin,
            },
        }
    }
}

fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cluster_row(json: &str) -> HierarchyRow {
        HierarchyRow::Cluster(serde_json::from_str(json).expect("cluster node"))
    }

    #[test]
    fn entity_id_prefers_generic_id_over_level_id() {
        let row = cluster_row(r#"{"id": "X9", "clusterId": "CL1", "clusterName": "EMEA"}"#);
        assert_eq!(row.entity_id(), Some("X9".to_string()));
    }

    #[test]
    fn entity_id_falls_back_to_level_id_then_key() {
        let row = cluster_row(r#"{"clusterId": "CL1", "clusterName": "EMEA"}"#);
        assert_eq!(row.entity_id(), Some("CL1".to_string()));

        let row = cluster_row(r#"{"clusterName": "EMEA", "key": "k-7"}"#);
        assert_eq!(row.entity_id(), Some("k-7".to_string()));

        let row = cluster_row(r#"{"clusterName": "EMEA"}"#);
        assert_eq!(row.entity_id(), None);
    }

    #[test]
    fn numeric_generic_id_renders_as_string() {
        let row = cluster_row(r#"{"id": 42, "clusterName": "EMEA"}"#);
        assert_eq!(row.entity_id(), Some("42".to_string()));
    }

    #[test]
    fn account_parent_is_its_cluster() {
        let node: AccountNode = serde_json::from_str(
            r#"{"accountId": "A1", "accountName": "Acme", "clusterId": "CL1",
                "revenue": 10.0, "cost": 5.0, "grossProfit": 5.0, "margin": 50.0}"#,
        )
        .expect("account node");
        let row = HierarchyRow::Account(node);
        assert_eq!(row.parent_id(), Some("CL1".to_string()));
        assert_eq!(row.metrics().gross_profit, 5.0);
    }

    #[test]
    fn display_name_falls_back_to_entity_id() {
        let row = cluster_row(r#"{"clusterId": "CL1"}"#);
        assert_eq!(row.display_name(), "CL1");
    }

    #[test]
    fn default_mode_tracks_role() {
        assert_eq!(
            HierarchyMode::default_for_role(UserRole::ProjectManager),
            HierarchyMode::Project
        );
        assert_eq!(
            HierarchyMode::default_for_role(UserRole::AccountDirector),
            HierarchyMode::Account
        );
        assert_eq!(
            HierarchyMode::default_for_role(UserRole::Admin),
            HierarchyMode::Cluster
        );
    }

    #[test]
    fn resource_mode_has_no_action_column() {
        assert!(
            HierarchyMode::Cluster
                .columns()
                .iter()
                .any(|c| c.key == "actions")
        );
        assert!(
            HierarchyMode::Resource
                .columns()
                .iter()
                .all(|c| c.key != "actions")
        );
    }

    #[test]
    fn mode_parses_from_lowercase() {
        let mode: HierarchyMode = "project".parse().expect("mode");
        assert_eq!(mode, HierarchyMode::Project);
        assert_eq!(HierarchyMode::Resource.to_string(), "resource");
    }

    #[test]
    fn nested_accounts_deserialize() {
        let node: ClusterNode = serde_json::from_str(
            r#"{
                "clusterId": "CL1", "clusterName": "EMEA",
                "revenue": 100.0, "cost": 60.0, "grossProfit": 40.0,
                "margin": 40.0, "accountCount": 1,
                "accounts": [{"accountId": "A1", "accountName": "Acme",
                              "revenue": 100.0, "cost": 60.0,
                              "grossProfit": 40.0, "margin": 40.0}]
            }"#,
        )
        .expect("cluster node");
        let accounts = node.accounts.as_deref().unwrap_or_default();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_name.as_deref(), Some("Acme"));
    }
}
