//! Cascading filter-option resolution.
//!
//! Account options depend on the selected clusters, project options on the
//! selected accounts. Each dependent level carries a monotonically
//! increasing request generation; a response whose generation is no longer
//! current by the time it resolves is discarded, so a slow stale fetch can
//! never overwrite the effect of a newer one.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tracing::warn;

use finsight_backend_client::ApiClient;
use finsight_backend_client::ApiError;
use finsight_protocol::FilterOption;
use finsight_protocol::FilterState;

/// Fetch seam for the option endpoints.
#[async_trait]
pub trait OptionsProvider: Send + Sync {
    async fn cluster_options(&self) -> Result<Vec<FilterOption>, ApiError>;
    async fn account_options(&self, cluster_ids: &[String])
    -> Result<Vec<FilterOption>, ApiError>;
    async fn project_options(&self, account_ids: &[String])
    -> Result<Vec<FilterOption>, ApiError>;
    async fn kpi_options(&self) -> Result<Vec<String>, ApiError>;
}

#[async_trait]
impl OptionsProvider for ApiClient {
    async fn cluster_options(&self) -> Result<Vec<FilterOption>, ApiError> {
        ApiClient::cluster_options(self).await
    }

    async fn account_options(
        &self,
        cluster_ids: &[String],
    ) -> Result<Vec<FilterOption>, ApiError> {
        ApiClient::account_options(self, cluster_ids).await
    }

    async fn project_options(
        &self,
        account_ids: &[String],
    ) -> Result<Vec<FilterOption>, ApiError> {
        ApiClient::project_options(self, account_ids).await
    }

    async fn kpi_options(&self) -> Result<Vec<String>, ApiError> {
        ApiClient::kpi_options(self).await
    }
}

#[derive(Default)]
struct OptionLists {
    clusters: Vec<FilterOption>,
    accounts: Vec<FilterOption>,
    projects: Vec<FilterOption>,
    kpis: Vec<String>,
}

pub struct OptionsResolver {
    provider: Arc<dyn OptionsProvider>,
    lists: Mutex<OptionLists>,
    account_generation: AtomicU64,
    project_generation: AtomicU64,
}

impl OptionsResolver {
    pub fn new(provider: Arc<dyn OptionsProvider>) -> Self {
        Self {
            provider,
            lists: Mutex::new(OptionLists::default()),
            account_generation: AtomicU64::new(0),
            project_generation: AtomicU64::new(0),
        }
    }

    pub fn clusters(&self) -> Vec<FilterOption> {
        self.lists
            .lock()
            .map(|lists| lists.clusters.clone())
            .unwrap_or_default()
    }

    pub fn accounts(&self) -> Vec<FilterOption> {
        self.lists
            .lock()
            .map(|lists| lists.accounts.clone())
            .unwrap_or_default()
    }

    pub fn projects(&self) -> Vec<FilterOption> {
        self.lists
            .lock()
            .map(|lists| lists.projects.clone())
            .unwrap_or_default()
    }

    pub fn kpis(&self) -> Vec<String> {
        self.lists
            .lock()
            .map(|lists| lists.kpis.clone())
            .unwrap_or_default()
    }

    /// Load the level-independent lists. Failures keep whatever was there.
    pub async fn load_static(&self) {
        match self.provider.cluster_options().await {
            Ok(clusters) => {
                if let Ok(mut lists) = self.lists.lock() {
                    lists.clusters = clusters;
                }
            }
            Err(err) => warn!("failed to load cluster options: {err}"),
        }
        match self.provider.kpi_options().await {
            Ok(kpis) => {
                if let Ok(mut lists) = self.lists.lock() {
                    lists.kpis = kpis;
                }
            }
            Err(err) => warn!("failed to load kpi options: {err}"),
        }
    }

    /// Re-fetch account options for the selected clusters (unscoped when
    /// none are selected), then prune selections the new list no longer
    /// contains.
    ///
    /// Returns the pruned account selection only when pruning actually
    /// removed something, so callers can skip redundant downstream
    /// refetches when nothing changed. `None` also covers fetch failures
    /// and stale responses, both of which leave state untouched.
    pub async fn sync_accounts(&self, filters: &FilterState) -> Option<Vec<String>> {
        let generation = self.account_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let options = match self.provider.account_options(&filters.clusters).await {
            Ok(options) => options,
            Err(err) => {
                warn!("failed to load account options: {err}");
                return None;
            }
        };
        if self.account_generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        if let Ok(mut lists) = self.lists.lock() {
            lists.accounts = options.clone();
        }
        prune(&filters.accounts, &options)
    }

    /// Re-fetch project options. The scope is the selected accounts; with
    /// none selected it widens to every currently available account, and
    /// if that set is empty the list is cleared without a network call.
    pub async fn sync_projects(&self, filters: &FilterState) -> Option<Vec<String>> {
        let generation = self.project_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let scope: Vec<String> = if !filters.accounts.is_empty() {
            filters.accounts.clone()
        } else if !filters.clusters.is_empty() {
            let available: Vec<String> = self
                .accounts()
                .iter()
                .map(|opt| opt.value.as_key())
                .collect();
            if available.is_empty() {
                if self.project_generation.load(Ordering::SeqCst) == generation
                    && let Ok(mut lists) = self.lists.lock()
                {
                    lists.projects.clear();
                }
                return None;
            }
            available
        } else {
            Vec::new()
        };

        let options = match self.provider.project_options(&scope).await {
            Ok(options) => options,
            Err(err) => {
                warn!("failed to load project options: {err}");
                return None;
            }
        };
        if self.project_generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        if let Ok(mut lists) = self.lists.lock() {
            lists.projects = options.clone();
        }
        prune(&filters.projects, &options)
    }
}

/// Drop selections the option list no longer offers, comparing ids as
/// strings against both identity keys. `None` means nothing was removed.
fn prune(selected: &[String], options: &[FilterOption]) -> Option<Vec<String>> {
    let retained: Vec<String> = selected
        .iter()
        .filter(|id| options.iter().any(|opt| opt.matches(id)))
        .cloned()
        .collect();
    if retained.len() == selected.len() {
        None
    } else {
        Some(retained)
    }
}
