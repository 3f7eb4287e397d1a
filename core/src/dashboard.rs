//! Dashboard session: owns the filter state, the active view tab and
//! hierarchy mode, and the currently fetched rows. Every filter, mode, or
//! tab change re-queries the matching endpoint and replaces the rows
//! wholesale.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tracing::warn;

use finsight_backend_client::ApiClient;
use finsight_backend_client::ApiError;
use finsight_backend_client::PnlQuery;
use finsight_protocol::FilterState;
use finsight_protocol::GridColumn;
use finsight_protocol::HierarchyMode;
use finsight_protocol::HierarchyRow;
use finsight_protocol::UserRole;

use crate::grid::Pager;
use crate::options::OptionsProvider;
use crate::options::OptionsResolver;

/// Fetch seam for the per-mode hierarchy endpoints.
#[async_trait]
pub trait HierarchyProvider: Send + Sync {
    async fn hierarchy_rows(
        &self,
        mode: HierarchyMode,
        query: &PnlQuery,
    ) -> Result<Vec<HierarchyRow>, ApiError>;
}

#[async_trait]
impl HierarchyProvider for ApiClient {
    async fn hierarchy_rows(
        &self,
        mode: HierarchyMode,
        query: &PnlQuery,
    ) -> Result<Vec<HierarchyRow>, ApiError> {
        ApiClient::hierarchy_rows(self, mode, query).await
    }
}

/// Top-level view toggle. Both views read the same fetched rows, but
/// switching between them still refetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTab {
    Grid,
    Chart,
}

/// Generation-guarded hierarchy fetch. Overlapping refreshes can resolve
/// out of order; only the most recently started one may replace the rows.
pub struct HierarchyFetcher {
    provider: Arc<dyn HierarchyProvider>,
    rows: Mutex<Vec<HierarchyRow>>,
    generation: AtomicU64,
}

impl HierarchyFetcher {
    pub fn new(provider: Arc<dyn HierarchyProvider>) -> Self {
        Self {
            provider,
            rows: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn rows(&self) -> Vec<HierarchyRow> {
        self.rows
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Fetch and replace. Returns whether the response was applied; fetch
    /// failures and stale responses leave the previous rows in place.
    pub async fn refresh(&self, mode: HierarchyMode, filters: &FilterState) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = PnlQuery::from_filters(filters);
        match self.provider.hierarchy_rows(mode, &query).await {
            Ok(rows) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                if let Ok(mut current) = self.rows.lock() {
                    *current = rows;
                }
                true
            }
            Err(err) => {
                warn!("hierarchy fetch failed for {mode} view: {err}");
                false
            }
        }
    }
}

pub struct DashboardSession {
    fetcher: HierarchyFetcher,
    resolver: OptionsResolver,
    filters: FilterState,
    tab: ViewTab,
    mode: HierarchyMode,
    pager: Pager,
}

impl DashboardSession {
    pub fn new(
        hierarchy: Arc<dyn HierarchyProvider>,
        options: Arc<dyn OptionsProvider>,
        role: UserRole,
    ) -> Self {
        Self {
            fetcher: HierarchyFetcher::new(hierarchy),
            resolver: OptionsResolver::new(options),
            filters: FilterState::default(),
            tab: ViewTab::Grid,
            mode: HierarchyMode::default_for_role(role),
            pager: Pager::new(),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn resolver(&self) -> &OptionsResolver {
        &self.resolver
    }

    pub fn tab(&self) -> ViewTab {
        self.tab
    }

    pub fn mode(&self) -> HierarchyMode {
        self.mode
    }

    pub fn columns(&self) -> &'static [GridColumn] {
        self.mode.columns()
    }

    /// Initial load: cluster/KPI option lists plus the first row fetch.
    pub async fn bootstrap(&mut self) {
        self.resolver.load_static().await;
        self.fetcher.refresh(self.mode, &self.filters).await;
    }

    /// Apply a filter mutation, cascade the dependent option lists, prune
    /// stale selections, and refetch.
    pub async fn update_filters(&mut self, mutate: impl FnOnce(&mut FilterState)) {
        let clusters_before = self.filters.clusters.clone();
        let accounts_before = self.filters.accounts.clone();
        mutate(&mut self.filters);

        let clusters_changed = self.filters.clusters != clusters_before;
        if clusters_changed
            && let Some(pruned) = self.resolver.sync_accounts(&self.filters).await
        {
            self.filters.accounts = pruned;
        }

        // The project list depends on accounts, clusters, and the resolved
        // account options, so any cluster change re-syncs it too.
        if clusters_changed || self.filters.accounts != accounts_before {
            if let Some(pruned) = self.resolver.sync_projects(&self.filters).await {
                self.filters.projects = pruned;
            }
        }

        self.fetcher.refresh(self.mode, &self.filters).await;
    }

    pub async fn set_mode(&mut self, mode: HierarchyMode) {
        if self.mode != mode {
            self.mode = mode;
            self.fetcher.refresh(self.mode, &self.filters).await;
        }
    }

    pub async fn set_tab(&mut self, tab: ViewTab) {
        if self.tab != tab {
            self.tab = tab;
            self.fetcher.refresh(self.mode, &self.filters).await;
        }
    }

    /// All fetched rows that clear the margin filter. The list filters are
    /// already applied server-side by the hierarchy endpoints.
    pub fn visible_rows(&self) -> Vec<HierarchyRow> {
        let (min, max) = self.filters.margin_range;
        self.fetcher
            .rows()
            .into_iter()
            .filter(|row| {
                let margin = row.metrics().margin;
                let margin = if margin.is_finite() { margin } else { 0.0 };
                (min..=max).contains(&margin)
            })
            .collect()
    }

    /// The grid page of [`visible_rows`], resetting to page 1 whenever the
    /// filters, mode, or row count changed underneath the pager.
    pub fn grid_page(&mut self) -> Vec<HierarchyRow> {
        let rows = self.visible_rows();
        self.pager.observe(&self.filters, self.mode, rows.len());
        self.pager.slice(&rows).to_vec()
    }

    pub fn next_page(&mut self) {
        let row_count = self.visible_rows().len();
        self.pager.next(row_count);
    }

    pub fn prev_page(&mut self) {
        self.pager.prev();
    }

    pub fn page(&self) -> usize {
        self.pager.page()
    }
}
