use serde::Deserialize;
use serde::Serialize;

/// Gross margin as a percentage, guarding the zero-revenue case. Every
/// margin computed anywhere in the engine goes through this so the
/// divide-by-zero behavior stays identical.
pub fn margin_percent(gross_profit: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        gross_profit / revenue * 100.0
    } else {
        0.0
    }
}

/// One flat P&L fact as served by `GET /pnl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlRow {
    pub id: String,
    pub cluster: String,
    pub account: String,
    pub project: String,
    pub year: i32,
    pub month: String,
    pub revenue: f64,
    pub cost: f64,
    pub gross_profit: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub headcount: f64,
    #[serde(default)]
    pub utilization: f64,
}

impl PnlRow {
    /// Recompute the derived fields from `revenue`/`cost`, preserving the
    /// invariants `gross_profit = revenue - cost` and the guarded margin.
    pub fn with_computed_metrics(mut self) -> Self {
        self.gross_profit = self.revenue - self.cost;
        self.margin = margin_percent(self.gross_profit, self.revenue);
        self
    }
}

/// Paged envelope returned by the flat P&L endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Server-side KPI rollup from `GET /pnl/summary/kpis`.
///
/// `utilization` arrives as a 0..1 fraction; the UI contract multiplies by
/// 100 before display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub revenue: f64,
    pub cost: f64,
    pub gross_profit: f64,
    pub margin: f64,
    pub headcount: f64,
    pub utilization: f64,
    pub revenue_per_head: f64,
    pub cost_per_head: f64,
}

impl KpiSummary {
    pub fn display_utilization(&self) -> f64 {
        self.utilization * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn margin_guards_zero_revenue() {
        assert_eq!(margin_percent(500.0, 0.0), 0.0);
        assert_eq!(margin_percent(500.0, -1.0), 0.0);
        assert_eq!(margin_percent(50.0, 200.0), 25.0);
    }

    #[test]
    fn computed_metrics_hold_invariants() {
        let row = PnlRow {
            id: "r1".to_string(),
            cluster: "CL1".to_string(),
            account: "A1".to_string(),
            project: "P1".to_string(),
            year: 2025,
            month: "March".to_string(),
            revenue: 1000.0,
            cost: 600.0,
            gross_profit: 0.0,
            margin: 0.0,
            headcount: 4.0,
            utilization: 80.0,
        }
        .with_computed_metrics();
        assert_eq!(row.gross_profit, 400.0);
        assert_eq!(row.margin, 40.0);
    }

    #[test]
    fn missing_margin_defaults_to_zero() {
        let row: PnlRow = serde_json::from_str(
            r#"{
                "id": "r1", "cluster": "CL1", "account": "A1", "project": "P1",
                "year": 2025, "month": "March",
                "revenue": 100.0, "cost": 80.0, "grossProfit": 20.0
            }"#,
        )
        .expect("deserialize");
        assert_eq!(row.margin, 0.0);
        assert_eq!(row.headcount, 0.0);
    }

    #[test]
    fn summary_utilization_scales_to_percent() {
        let summary = KpiSummary {
            revenue: 1.0,
            cost: 1.0,
            gross_profit: 0.0,
            margin: 0.0,
            headcount: 1.0,
            utilization: 0.57,
            revenue_per_head: 1.0,
            cost_per_head: 1.0,
        };
        assert_eq!(summary.display_utilization(), 57.0);
    }
}
