use serde::Deserialize;
use serde::Serialize;

/// Margin range restored by [`FilterState::clear_all`].
pub const DEFAULT_MARGIN_RANGE: (f64, f64) = (30.0, 100.0);

const MARGIN_FLOOR: f64 = -100.0;
const MARGIN_CEIL: f64 = 100.0;

/// Names the list-valued filter fields that share the toggle/set-all
/// reducer. Years are `i32` and route through their own pair of methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Clusters,
    Accounts,
    Projects,
    AnalyzeBy,
    Months,
}

/// Direction of the single-threshold margin filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginMode {
    /// Rows at or above the threshold pass.
    Greater,
    /// Rows at or below the threshold pass.
    Lesser,
}

/// The canonical dashboard query: selected ids per hierarchy level, the KPI
/// labels scoping the year/month selectors, and the inclusive margin range.
///
/// One instance lives for the duration of a dashboard session and is never
/// persisted; a page reload starts from [`FilterState::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub clusters: Vec<String>,
    pub accounts: Vec<String>,
    pub projects: Vec<String>,
    pub analyze_by: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<String>,
    pub margin_range: (f64, f64),
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
            accounts: Vec::new(),
            projects: Vec::new(),
            analyze_by: Vec::new(),
            years: Vec::new(),
            months: Vec::new(),
            margin_range: DEFAULT_MARGIN_RANGE,
        }
    }
}

impl FilterState {
    /// Add `value` to the named list if absent, remove it otherwise.
    ///
    /// Values that no longer appear in the available option list are still
    /// accepted; stale selections are pruned by the options resolver, not
    /// rejected here.
    pub fn toggle(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        let list = self.list_mut(key);
        match list.iter().position(|v| *v == value) {
            Some(idx) => {
                list.remove(idx);
            }
            None => list.push(value),
        }
    }

    /// Replace the named list wholesale. "Select all" passes every option
    /// value; toggling select-all off passes an empty vec.
    pub fn set_all(&mut self, key: FilterKey, values: Vec<String>) {
        *self.list_mut(key) = values;
    }

    pub fn toggle_year(&mut self, year: i32) {
        match self.years.iter().position(|y| *y == year) {
            Some(idx) => {
                self.years.remove(idx);
            }
            None => self.years.push(year),
        }
    }

    pub fn set_all_years(&mut self, years: Vec<i32>) {
        self.years = years;
    }

    /// Map a single threshold to the asymmetric inclusive range. The raw
    /// text comes straight from the threshold input; anything unparsable
    /// coerces to `0`.
    pub fn set_margin_range(&mut self, mode: MarginMode, raw_threshold: &str) {
        let threshold = raw_threshold.trim().parse::<f64>().unwrap_or(0.0);
        self.margin_range = match mode {
            MarginMode::Greater => (threshold, MARGIN_CEIL),
            MarginMode::Lesser => (MARGIN_FLOOR, threshold),
        };
    }

    /// Reset every selection and restore the default margin range.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    /// Number of active selections across all list filters. The margin
    /// range does not count; it always has a value.
    pub fn active_filter_count(&self) -> usize {
        self.clusters.len()
            + self.accounts.len()
            + self.projects.len()
            + self.analyze_by.len()
            + self.years.len()
            + self.months.len()
    }

    fn list_mut(&mut self, key: FilterKey) -> &mut Vec<String> {
        match key {
            FilterKey::Clusters => &mut self.clusters,
            FilterKey::Accounts => &mut self.accounts,
            FilterKey::Projects => &mut self.projects,
            FilterKey::AnalyzeBy => &mut self.analyze_by,
            FilterKey::Months => &mut self.months,
        }
    }
}
