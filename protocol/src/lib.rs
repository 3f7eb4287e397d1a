//! Shared wire types for the FinSight dashboard engine.
//!
//! Everything here mirrors the JSON contracts of the reporting backend:
//! filter state and option lists, flat P&L facts, rolled-up hierarchy
//! nodes, and chat transcript entries. Types only, no I/O.

mod chat;
mod filters;
mod hierarchy;
mod options;
mod pnl;
mod user;

pub use chat::ChatMessage;
pub use chat::ChatRole;
pub use filters::FilterKey;
pub use filters::FilterState;
pub use filters::MarginMode;
pub use filters::DEFAULT_MARGIN_RANGE;
pub use hierarchy::AccountNode;
pub use hierarchy::ClusterNode;
pub use hierarchy::GridColumn;
pub use hierarchy::HierarchyMode;
pub use hierarchy::HierarchyRow;
pub use hierarchy::Metrics;
pub use hierarchy::ProjectNode;
pub use hierarchy::ResourceDetail;
pub use options::FilterOption;
pub use options::OptionKey;
pub use pnl::margin_percent;
pub use pnl::KpiSummary;
pub use pnl::Paged;
pub use pnl::PnlRow;
pub use user::User;
pub use user::UserRole;

/// Calendar month names, in order. Chart grouping keys are derived from the
/// index into this table.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// KPI labels offered by the "Analyze By" selector when the backend does not
/// provide its own list.
pub const KPI_OPTIONS: [&str; 8] = [
    "Revenue",
    "Cost",
    "Gross Profit",
    "Margin %",
    "Headcount",
    "Utilization %",
    "Revenue per Head",
    "Cost per Head",
];

/// Zero-based calendar index of a full month name, `None` for anything that
/// is not one of [`MONTHS`].
pub fn month_index(name: &str) -> Option<usize> {
    MONTHS.iter().position(|m| *m == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn month_index_matches_calendar_order() {
        assert_eq!(month_index("January"), Some(0));
        assert_eq!(month_index("December"), Some(11));
        assert_eq!(month_index("Jan"), None);
    }
}
