use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use finsight_protocol::AccountNode;
use finsight_protocol::ClusterNode;
use finsight_protocol::FilterOption;
use finsight_protocol::HierarchyMode;
use finsight_protocol::HierarchyRow;
use finsight_protocol::KpiSummary;
use finsight_protocol::Paged;
use finsight_protocol::PnlRow;
use finsight_protocol::ProjectNode;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::query::PnlQuery;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource mode pulls flat facts instead of a rollup; the page size is
/// capped rather than paginated through.
pub const RESOURCE_PAGE_SIZE: u32 = 1000;

#[derive(Deserialize)]
struct OptionsEnvelope {
    options: Vec<FilterOption>,
}

#[derive(Deserialize)]
struct LabelsEnvelope {
    options: Vec<String>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

/// Typed surface over the reporting REST API. Every request carries the
/// session's bearer token; a 401 triggers exactly one refresh-and-retry.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    auth: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<AuthSession>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            auth,
        })
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub async fn cluster_options(&self) -> Result<Vec<FilterOption>, ApiError> {
        let envelope: OptionsEnvelope = self.get_json("/filters/options/clusters", &[]).await?;
        Ok(envelope.options)
    }

    /// Account options, scoped to the given clusters when any are selected.
    pub async fn account_options(
        &self,
        cluster_ids: &[String],
    ) -> Result<Vec<FilterOption>, ApiError> {
        let params = scope_param("clusterId", cluster_ids);
        let envelope: OptionsEnvelope = self.get_json("/filters/options/accounts", &params).await?;
        Ok(envelope.options)
    }

    /// Project options, scoped to the given accounts when any are selected.
    pub async fn project_options(
        &self,
        account_ids: &[String],
    ) -> Result<Vec<FilterOption>, ApiError> {
        let params = scope_param("accountId", account_ids);
        let envelope: OptionsEnvelope = self.get_json("/filters/options/projects", &params).await?;
        Ok(envelope.options)
    }

    pub async fn kpi_options(&self) -> Result<Vec<String>, ApiError> {
        let envelope: LabelsEnvelope = self.get_json("/filters/options/kpis", &[]).await?;
        Ok(envelope.options)
    }

    pub async fn pnl(&self, query: &PnlQuery) -> Result<Paged<PnlRow>, ApiError> {
        self.get_json("/pnl", &query.to_params()).await
    }

    pub async fn kpi_summary(&self, query: &PnlQuery) -> Result<KpiSummary, ApiError> {
        self.get_json("/pnl/summary/kpis", &query.to_params()).await
    }

    pub async fn cluster_hierarchy(&self, query: &PnlQuery) -> Result<Vec<ClusterNode>, ApiError> {
        let envelope: DataEnvelope<ClusterNode> = self
            .get_json("/pnl/hierarchy/cluster", &query.to_params())
            .await?;
        Ok(envelope.data)
    }

    pub async fn account_hierarchy(&self, query: &PnlQuery) -> Result<Vec<AccountNode>, ApiError> {
        let envelope: DataEnvelope<AccountNode> = self
            .get_json("/pnl/hierarchy/account", &query.to_params())
            .await?;
        Ok(envelope.data)
    }

    pub async fn project_hierarchy(&self, query: &PnlQuery) -> Result<Vec<ProjectNode>, ApiError> {
        let envelope: DataEnvelope<ProjectNode> = self
            .get_json("/pnl/hierarchy/project", &query.to_params())
            .await?;
        Ok(envelope.data)
    }

    /// Fetch the rows backing the active aggregation level. Resource mode
    /// queries the flat endpoint with its capped page size.
    pub async fn hierarchy_rows(
        &self,
        mode: HierarchyMode,
        query: &PnlQuery,
    ) -> Result<Vec<HierarchyRow>, ApiError> {
        let rows = match mode {
            HierarchyMode::Cluster => self
                .cluster_hierarchy(query)
                .await?
                .into_iter()
                .map(HierarchyRow::Cluster)
                .collect(),
            HierarchyMode::Account => self
                .account_hierarchy(query)
                .await?
                .into_iter()
                .map(HierarchyRow::Account)
                .collect(),
            HierarchyMode::Project => self
                .project_hierarchy(query)
                .await?
                .into_iter()
                .map(HierarchyRow::Project)
                .collect(),
            HierarchyMode::Resource => {
                let paged = self
                    .pnl(&query.clone().with_page(1, RESOURCE_PAGE_SIZE))
                    .await?;
                paged.data.into_iter().map(HierarchyRow::Resource).collect()
            }
        };
        Ok(rows)
    }

    /// GET with bearer auth and the single refresh-and-retry on 401.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.send_get(&url, params).await?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("401 on {path}, attempting token refresh");
            self.auth.refresh().await?;
            let retried = self.send_get(&url, params).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                self.auth.teardown();
                return Err(ApiError::SessionExpired);
            }
            retried
        } else {
            resp
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(resp.json().await?)
    }

    async fn send_get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.http.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(token) = self.auth.access_token() {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

fn scope_param(key: &str, ids: &[String]) -> Vec<(String, String)> {
    if ids.is_empty() {
        Vec::new()
    } else {
        vec![(key.to_string(), ids.join(","))]
    }
}
