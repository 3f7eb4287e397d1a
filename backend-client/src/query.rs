use finsight_protocol::FilterState;

/// Query-string view of a [`FilterState`] for the P&L endpoints. Id lists
/// are comma-joined; empty selections omit the parameter entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnlQuery {
    pub cluster_ids: Vec<String>,
    pub account_ids: Vec<String>,
    pub project_ids: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PnlQuery {
    pub fn from_filters(filters: &FilterState) -> Self {
        Self {
            cluster_ids: filters.clusters.clone(),
            account_ids: filters.accounts.clone(),
            project_ids: filters.projects.clone(),
            years: filters.years.clone(),
            months: filters.months.clone(),
            page: None,
            page_size: None,
        }
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        push_joined(&mut params, "clusterIds", &self.cluster_ids);
        push_joined(&mut params, "accountIds", &self.account_ids);
        push_joined(&mut params, "projectIds", &self.project_ids);
        if !self.years.is_empty() {
            let joined = self
                .years
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("years".to_string(), joined));
        }
        push_joined(&mut params, "months", &self.months);
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            params.push(("pageSize".to_string(), page_size.to_string()));
        }
        params
    }
}

fn push_joined(params: &mut Vec<(String, String)>, key: &str, values: &[String]) {
    if !values.is_empty() {
        params.push((key.to_string(), values.join(",")));
    }
}
