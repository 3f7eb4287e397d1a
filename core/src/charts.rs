//! Grouping helpers behind the chart panels: monthly trends, per-cluster
//! revenue breakdown, and the top-accounts margin ranking.

use std::collections::BTreeMap;
use std::collections::HashMap;

use finsight_protocol::margin_percent;
use finsight_protocol::month_index;
use finsight_protocol::FilterOption;
use finsight_protocol::PnlRow;

/// Month/year series keep only the most recent window after chronological
/// sort.
const TREND_WINDOW: usize = 12;

/// The margin breakdown ranks this many accounts.
const TOP_ACCOUNTS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub label: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtilizationPoint {
    pub label: String,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownSlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarginSlice {
    pub name: String,
    pub margin: f64,
}

/// Composite chronological key: year, then the zero-padded calendar index
/// of the month. Months missing from the calendar table sort first.
fn month_key(row: &PnlRow) -> String {
    let index = month_index(&row.month).map(|i| i as i64).unwrap_or(-1);
    format!("{}-{index:02}", row.year)
}

fn month_label(row: &PnlRow) -> String {
    let short: String = row.month.chars().take(3).collect();
    format!("{short} {}", row.year)
}

/// Revenue/cost/profit summed per year-month group, chronological, last
/// twelve groups.
pub fn monthly_trend(rows: &[PnlRow]) -> Vec<TrendPoint> {
    // BTreeMap keeps the composite keys chronological for free.
    let mut grouped: BTreeMap<String, TrendPoint> = BTreeMap::new();
    for row in rows {
        let entry = grouped.entry(month_key(row)).or_insert_with(|| TrendPoint {
            label: month_label(row),
            revenue: 0.0,
            cost: 0.0,
            profit: 0.0,
        });
        entry.revenue += row.revenue;
        entry.cost += row.cost;
        entry.profit += row.gross_profit;
    }
    let skip = grouped.len().saturating_sub(TREND_WINDOW);
    grouped.into_values().skip(skip).collect()
}

/// Mean utilization per year-month group, chronological, last twelve.
pub fn utilization_trend(rows: &[PnlRow]) -> Vec<UtilizationPoint> {
    let mut grouped: BTreeMap<String, (String, f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(month_key(row))
            .or_insert_with(|| (month_label(row), 0.0, 0));
        entry.1 += row.utilization;
        entry.2 += 1;
    }
    let skip = grouped.len().saturating_sub(TREND_WINDOW);
    grouped
        .into_values()
        .skip(skip)
        .map(|(label, total, count)| UtilizationPoint {
            label,
            utilization: if count > 0 { total / count as f64 } else { 0.0 },
        })
        .collect()
}

/// Revenue summed per cluster display name, largest first. Ids resolve to
/// names through the current option list, falling back to the raw id.
pub fn revenue_by_cluster(rows: &[PnlRow], clusters: &[FilterOption]) -> Vec<BreakdownSlice> {
    let mut grouped: HashMap<String, f64> = HashMap::new();
    for row in rows {
        let name = FilterOption::name_for(clusters, &row.cluster).to_string();
        *grouped.entry(name).or_insert(0.0) += row.revenue;
    }
    let mut slices: Vec<BreakdownSlice> = grouped
        .into_iter()
        .map(|(name, value)| BreakdownSlice { name, value })
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    slices
}

/// Margin per account display name, computed from the summed profit and
/// revenue, descending, top ten.
pub fn margin_by_account(rows: &[PnlRow], accounts: &[FilterOption]) -> Vec<MarginSlice> {
    let mut grouped: HashMap<String, (f64, f64)> = HashMap::new();
    for row in rows {
        let name = FilterOption::name_for(accounts, &row.account).to_string();
        let entry = grouped.entry(name).or_insert((0.0, 0.0));
        entry.0 += row.revenue;
        entry.1 += row.gross_profit;
    }
    let mut slices: Vec<MarginSlice> = grouped
        .into_iter()
        .map(|(name, (revenue, profit))| MarginSlice {
            name,
            margin: margin_percent(profit, revenue),
        })
        .collect();
    slices.sort_by(|a, b| b.margin.total_cmp(&a.margin).then_with(|| a.name.cmp(&b.name)));
    slices.truncate(TOP_ACCOUNTS);
    slices
}
