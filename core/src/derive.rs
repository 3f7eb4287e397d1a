//! Client-side row derivation: the pure filter and sort stages between raw
//! P&L facts and whatever the grid renders.

use finsight_protocol::FilterState;
use finsight_protocol::PnlRow;

/// Which filters apply to a row set.
///
/// Hierarchy endpoints already scope by the selected ids server-side, so
/// their rows only get the margin filter; the flat legacy path applies the
/// whole filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    /// Margin range plus every non-empty list filter.
    Flat,
    /// Margin range only.
    MarginOnly,
}

/// Margin value used for range checks; anything non-finite counts as zero.
fn effective_margin(row: &PnlRow) -> f64 {
    if row.margin.is_finite() { row.margin } else { 0.0 }
}

/// A row survives iff its margin lies inside the inclusive range and, in
/// [`FilterScope::Flat`], every non-empty list filter contains the row's
/// matching field. An empty list is no constraint, never "exclude all".
pub fn row_passes(row: &PnlRow, filters: &FilterState, scope: FilterScope) -> bool {
    let (min, max) = filters.margin_range;
    if !(min..=max).contains(&effective_margin(row)) {
        return false;
    }
    if scope == FilterScope::MarginOnly {
        return true;
    }
    if !filters.clusters.is_empty() && !filters.clusters.contains(&row.cluster) {
        return false;
    }
    if !filters.accounts.is_empty() && !filters.accounts.contains(&row.account) {
        return false;
    }
    if !filters.projects.is_empty() && !filters.projects.contains(&row.project) {
        return false;
    }
    if !filters.years.is_empty() && !filters.years.contains(&row.year) {
        return false;
    }
    if !filters.months.is_empty() && !filters.months.contains(&row.month) {
        return false;
    }
    true
}

/// Order-preserving filtered copy of `rows`.
pub fn derive(rows: &[PnlRow], filters: &FilterState, scope: FilterScope) -> Vec<PnlRow> {
    rows.iter()
        .filter(|row| row_passes(row, filters, scope))
        .cloned()
        .collect()
}

/// Sortable grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Cluster,
    Account,
    Project,
    Year,
    Month,
    Revenue,
    Cost,
    GrossProfit,
    Margin,
    Headcount,
    Utilization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-column sort with the click cycle: a new column starts ascending,
/// clicking the same column flips to descending, a third click clears the
/// sort entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == Some(key) {
            match self.direction {
                Some(SortDirection::Ascending) => {
                    self.direction = Some(SortDirection::Descending);
                }
                _ => {
                    self.key = None;
                    self.direction = None;
                }
            }
        } else {
            self.key = Some(key);
            self.direction = Some(SortDirection::Ascending);
        }
    }

    /// Stable-sort `rows` in place; a cleared sort leaves the input order.
    pub fn apply(&self, rows: &mut [PnlRow]) {
        let (Some(key), Some(direction)) = (self.key, self.direction) else {
            return;
        };
        rows.sort_by(|a, b| {
            let ordering = compare(a, b, key);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }
}

fn compare(a: &PnlRow, b: &PnlRow, key: SortKey) -> std::cmp::Ordering {
    match key {
        SortKey::Cluster => fold_cmp(&a.cluster, &b.cluster),
        SortKey::Account => fold_cmp(&a.account, &b.account),
        SortKey::Project => fold_cmp(&a.project, &b.project),
        SortKey::Month => fold_cmp(&a.month, &b.month),
        SortKey::Year => a.year.cmp(&b.year),
        SortKey::Revenue => a.revenue.total_cmp(&b.revenue),
        SortKey::Cost => a.cost.total_cmp(&b.cost),
        SortKey::GrossProfit => a.gross_profit.total_cmp(&b.gross_profit),
        SortKey::Margin => a.margin.total_cmp(&b.margin),
        SortKey::Headcount => a.headcount.total_cmp(&b.headcount),
        SortKey::Utilization => a.utilization.total_cmp(&b.utilization),
    }
}

fn fold_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
pub(crate) fn test_row(
    id: &str,
    cluster: &str,
    account: &str,
    project: &str,
    year: i32,
    month: &str,
    revenue: f64,
    cost: f64,
) -> PnlRow {
    PnlRow {
        id: id.to_string(),
        cluster: cluster.to_string(),
        account: account.to_string(),
        project: project.to_string(),
        year,
        month: month.to_string(),
        revenue,
        cost,
        gross_profit: 0.0,
        margin: 0.0,
        headcount: 1.0,
        utilization: 80.0,
    }
    .with_computed_metrics()
}
