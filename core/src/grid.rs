//! Grid pagination. The page size is fixed; the current page snaps back to
//! the first whenever the query, view mode, or row count underneath it
//! changes.

use finsight_protocol::FilterState;
use finsight_protocol::HierarchyMode;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
struct PageContext {
    filters: FilterState,
    mode: HierarchyMode,
    row_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pager {
    page: usize,
    context: Option<PageContext>,
}

impl Pager {
    pub fn new() -> Self {
        Self {
            page: 1,
            context: None,
        }
    }

    /// 1-based current page.
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn page_count(row_count: usize) -> usize {
        row_count.div_ceil(PAGE_SIZE).max(1)
    }

    /// Snap back to page 1 when the inputs feeding the grid changed.
    pub fn observe(&mut self, filters: &FilterState, mode: HierarchyMode, row_count: usize) {
        let context = PageContext {
            filters: filters.clone(),
            mode,
            row_count,
        };
        if self.context.as_ref() != Some(&context) {
            self.page = 1;
            self.context = Some(context);
        }
    }

    /// Advance one page; past the last page this is a no-op.
    pub fn next(&mut self, row_count: usize) {
        if self.page() < Self::page_count(row_count) {
            self.page = self.page() + 1;
        }
    }

    /// Back one page; before the first page this is a no-op.
    pub fn prev(&mut self) {
        if self.page() > 1 {
            self.page -= 1;
        }
    }

    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let start = (self.page() - 1) * PAGE_SIZE;
        if start >= rows.len() {
            return &[];
        }
        let end = (start + PAGE_SIZE).min(rows.len());
        &rows[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn third_page_of_twenty_three_rows_has_three() {
        let rows = rows(23);
        let mut pager = Pager::new();
        pager.observe(&FilterState::default(), HierarchyMode::Resource, rows.len());
        pager.next(rows.len());
        pager.next(rows.len());
        assert_eq!(pager.page(), 3);
        assert_eq!(pager.slice(&rows).len(), 3);
    }

    #[test]
    fn next_past_the_last_page_is_a_no_op() {
        let rows = rows(23);
        let mut pager = Pager::new();
        pager.observe(&FilterState::default(), HierarchyMode::Resource, rows.len());
        for _ in 0..10 {
            pager.next(rows.len());
        }
        assert_eq!(pager.page(), 3);
    }

    #[test]
    fn prev_before_the_first_page_is_a_no_op() {
        let mut pager = Pager::new();
        pager.prev();
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn filter_change_resets_the_page() {
        let rows = rows(40);
        let mut pager = Pager::new();
        let filters = FilterState::default();
        pager.observe(&filters, HierarchyMode::Cluster, rows.len());
        pager.next(rows.len());
        assert_eq!(pager.page(), 2);

        let mut changed = filters.clone();
        changed.clusters.push("CL1".to_string());
        pager.observe(&changed, HierarchyMode::Cluster, rows.len());
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn row_count_change_resets_the_page() {
        let filters = FilterState::default();
        let mut pager = Pager::new();
        pager.observe(&filters, HierarchyMode::Cluster, 40);
        pager.next(40);
        pager.observe(&filters, HierarchyMode::Cluster, 39);
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn unchanged_inputs_keep_the_page() {
        let filters = FilterState::default();
        let mut pager = Pager::new();
        pager.observe(&filters, HierarchyMode::Cluster, 40);
        pager.next(40);
        pager.observe(&filters, HierarchyMode::Cluster, 40);
        assert_eq!(pager.page(), 2);
    }
}
