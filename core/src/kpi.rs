//! KPI card metrics: preferably the server rollup, otherwise computed
//! client-side from whatever rows are on hand.

use std::collections::HashSet;

use finsight_protocol::margin_percent;
use finsight_protocol::FilterState;
use finsight_protocol::KpiSummary;
use finsight_protocol::PnlRow;

use crate::derive::row_passes;
use crate::derive::FilterScope;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KpiMetrics {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub avg_margin: f64,
    pub avg_headcount: f64,
    pub avg_utilization: f64,
    pub project_count: usize,
    pub account_count: usize,
}

impl KpiMetrics {
    /// Adopt the server rollup. Utilization arrives as a fraction and is
    /// scaled to the percentage the cards display; the server does not
    /// report distinct entity counts.
    pub fn from_summary(summary: &KpiSummary) -> Self {
        Self {
            total_revenue: summary.revenue,
            total_cost: summary.cost,
            total_profit: summary.gross_profit,
            avg_margin: summary.margin,
            avg_headcount: summary.headcount,
            avg_utilization: summary.display_utilization(),
            project_count: 0,
            account_count: 0,
        }
    }

    /// Client-side fallback over the filtered rows.
    pub fn compute(rows: &[PnlRow], filters: &FilterState) -> Self {
        let filtered: Vec<&PnlRow> = rows
            .iter()
            .filter(|row| row_passes(row, filters, FilterScope::Flat))
            .collect();
        let count = filtered.len();
        let total_revenue: f64 = filtered.iter().map(|r| r.revenue).sum();
        let total_cost: f64 = filtered.iter().map(|r| r.cost).sum();
        let total_profit: f64 = filtered.iter().map(|r| r.gross_profit).sum();
        let (avg_headcount, avg_utilization) = if count > 0 {
            (
                filtered.iter().map(|r| r.headcount).sum::<f64>() / count as f64,
                filtered.iter().map(|r| r.utilization).sum::<f64>() / count as f64,
            )
        } else {
            (0.0, 0.0)
        };
        let projects: HashSet<&str> = filtered.iter().map(|r| r.project.as_str()).collect();
        let accounts: HashSet<&str> = filtered.iter().map(|r| r.account.as_str()).collect();
        Self {
            total_revenue,
            total_cost,
            total_profit,
            avg_margin: margin_percent(total_profit, total_revenue),
            avg_headcount,
            avg_utilization,
            project_count: projects.len(),
            account_count: accounts.len(),
        }
    }
}
