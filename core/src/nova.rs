//! Ask-Nova context assembly.
//!
//! Scopes a chat question to one hierarchy row: the row's identifying key
//! becomes a single-element filter at the active level, the matching
//! hierarchy endpoint is re-queried with that scope, and the result is
//! embedded as a fenced JSON block under the user's question. When the id
//! cannot be resolved or the re-query fails, the raw row stands in as
//! context; the question is never dropped.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use finsight_backend_client::PnlQuery;
use finsight_protocol::FilterState;
use finsight_protocol::HierarchyMode;
use finsight_protocol::HierarchyRow;

use crate::chat::ChatSession;
use crate::dashboard::HierarchyProvider;

/// Grace period for the chat panel's mount animation before the composed
/// prompt is injected.
const PANEL_MOUNT_DELAY: Duration = Duration::from_millis(300);

pub struct NovaAssembler {
    provider: Arc<dyn HierarchyProvider>,
}

impl NovaAssembler {
    pub fn new(provider: Arc<dyn HierarchyProvider>) -> Self {
        Self { provider }
    }

    /// Build the scoped prompt for `question` about `row`.
    pub async fn assemble(
        &self,
        filters: &FilterState,
        mode: HierarchyMode,
        row: &HierarchyRow,
        question: &str,
    ) -> String {
        let context = self.context_for(filters, mode, row).await;
        compose_prompt(question, mode, &context)
    }

    /// Assemble and inject into the chat session after the panel mount
    /// delay.
    pub async fn dispatch(
        &self,
        chat: &mut ChatSession,
        filters: &FilterState,
        mode: HierarchyMode,
        row: &HierarchyRow,
        question: &str,
    ) {
        let prompt = self.assemble(filters, mode, row, question).await;
        tokio::time::sleep(PANEL_MOUNT_DELAY).await;
        chat.inject(&prompt).await;
    }

    async fn context_for(
        &self,
        filters: &FilterState,
        mode: HierarchyMode,
        row: &HierarchyRow,
    ) -> Value {
        let Some(scoped) = scoped_filters(filters, mode, row) else {
            return raw_row(row);
        };
        let query = PnlQuery::from_filters(&scoped);
        match self.provider.hierarchy_rows(mode, &query).await {
            Ok(rows) => serde_json::to_value(rows).unwrap_or_else(|_| raw_row(row)),
            Err(err) => {
                warn!("scoped context fetch failed, falling back to the raw row: {err}");
                raw_row(row)
            }
        }
    }
}

/// The current filters with all three id levels cleared, then exactly one
/// level set to the row's resolved id. Accounts also carry the owning
/// cluster, projects the owning account, when the row knows its parent.
/// `None` when the id cannot be resolved or the level is not drillable.
fn scoped_filters(
    filters: &FilterState,
    mode: HierarchyMode,
    row: &HierarchyRow,
) -> Option<FilterState> {
    let id = row.entity_id()?;
    let mut scoped = filters.clone();
    scoped.clusters.clear();
    scoped.accounts.clear();
    scoped.projects.clear();
    match mode {
        HierarchyMode::Cluster => scoped.clusters = vec![id],
        HierarchyMode::Account => {
            scoped.accounts = vec![id];
            if let Some(parent) = row.parent_id() {
                scoped.clusters = vec![parent];
            }
        }
        HierarchyMode::Project => {
            scoped.projects = vec![id];
            if let Some(parent) = row.parent_id() {
                scoped.accounts = vec![parent];
            }
        }
        HierarchyMode::Resource => return None,
    }
    Some(scoped)
}

fn raw_row(row: &HierarchyRow) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

fn compose_prompt(question: &str, mode: HierarchyMode, context: &Value) -> String {
    let payload =
        serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
    format!("User Question: {question}\n\nContext Data ({mode} level):\n```json\n{payload}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use finsight_backend_client::ApiError;
    use finsight_protocol::ClusterNode;
    use finsight_protocol::Metrics;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn cluster_row(json: &str) -> HierarchyRow {
        HierarchyRow::Cluster(serde_json::from_str::<ClusterNode>(json).expect("cluster node"))
    }

    struct RecordingProvider {
        queries: Mutex<Vec<(HierarchyMode, PnlQuery)>>,
        fail: bool,
    }

    impl RecordingProvider {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl HierarchyProvider for RecordingProvider {
        async fn hierarchy_rows(
            &self,
            mode: HierarchyMode,
            query: &PnlQuery,
        ) -> Result<Vec<HierarchyRow>, ApiError> {
            self.queries
                .lock()
                .expect("queries")
                .push((mode, query.clone()));
            if self.fail {
                return Err(ApiError::SessionExpired);
            }
            Ok(vec![HierarchyRow::Cluster(ClusterNode {
                cluster_id: Some("CL1".to_string()),
                cluster_name: Some("EMEA".to_string()),
                metrics: Metrics {
                    revenue: 100.0,
                    cost: 60.0,
                    gross_profit: 40.0,
                    margin: 40.0,
                },
                account_count: 2,
                accounts: None,
                extra: serde_json::Map::new(),
            })])
        }
    }

    #[tokio::test]
    async fn cluster_prompt_scopes_to_the_row_id() {
        let provider = RecordingProvider::new(false);
        let assembler = NovaAssembler::new(provider.clone());
        let row = cluster_row(r#"{"id": "CL1", "clusterName": "EMEA"}"#);

        let prompt = assembler
            .assemble(
                &FilterState::default(),
                HierarchyMode::Cluster,
                &row,
                "trend?",
            )
            .await;

        assert!(prompt.contains("User Question: trend?"));
        assert!(prompt.contains("Context Data (cluster level):"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"clusterName\": \"EMEA\""));

        let queries = provider.queries.lock().expect("queries");
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, HierarchyMode::Cluster);
        assert_eq!(queries[0].1.cluster_ids, vec!["CL1".to_string()]);
        assert_eq!(queries[0].1.account_ids, Vec::<String>::new());
    }

    #[tokio::test]
    async fn account_scope_carries_the_parent_cluster() {
        let provider = RecordingProvider::new(false);
        let assembler = NovaAssembler::new(provider.clone());
        let row = HierarchyRow::Account(
            serde_json::from_str(
                r#"{"accountId": "A1", "accountName": "Acme", "clusterId": "CL1"}"#,
            )
            .expect("account node"),
        );

        let mut filters = FilterState::default();
        filters.clusters = vec!["CL9".to_string()];
        filters.years = vec![2025];
        assembler
            .assemble(&filters, HierarchyMode::Account, &row, "why down?")
            .await;

        let queries = provider.queries.lock().expect("queries");
        assert_eq!(queries[0].1.account_ids, vec!["A1".to_string()]);
        // The stale cluster selection is replaced by the row's parent.
        assert_eq!(queries[0].1.cluster_ids, vec!["CL1".to_string()]);
        // Non-hierarchy filters survive the scoping.
        assert_eq!(queries[0].1.years, vec![2025]);
    }

    #[tokio::test]
    async fn unresolvable_id_embeds_the_raw_row() {
        let provider = RecordingProvider::new(false);
        let assembler = NovaAssembler::new(provider.clone());
        let row = cluster_row(r#"{"clusterName": "Mystery"}"#);

        let prompt = assembler
            .assemble(
                &FilterState::default(),
                HierarchyMode::Cluster,
                &row,
                "trend?",
            )
            .await;

        assert!(provider.queries.lock().expect("queries").is_empty());
        assert!(prompt.contains("User Question: trend?"));
        assert!(prompt.contains("Mystery"));
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_the_raw_row() {
        let provider = RecordingProvider::new(true);
        let assembler = NovaAssembler::new(provider);
        let row = cluster_row(r#"{"id": "CL1", "clusterName": "EMEA"}"#);

        let prompt = assembler
            .assemble(
                &FilterState::default(),
                HierarchyMode::Cluster,
                &row,
                "trend?",
            )
            .await;

        assert!(prompt.contains("User Question: trend?"));
        assert!(prompt.contains("EMEA"));
    }
}
